use tracing::{debug, info, warn};

use crate::backend::{check_hideable, HiddenWindowInfo, HideVia, HidingBackend};
use crate::enumeration::WindowSnapshot;
use crate::errors::{TrayError, TrayResult};
use crate::persistence::HiddenStore;
use crate::platform::{Hwnd, NotifyArea, WindowSystem};



# [ derive (Debug, Eq, PartialEq, Hash, Copy, Clone) ]
pub struct NativeEntry {
    pub hwnd    : Hwnd,
    pub icon_id : u32,
}


pub struct NativeTrayRegistry {
    notify       : Box <dyn NotifyArea>,
    entries      : Vec <NativeEntry>,
    next_icon_id : u32,
    capacity     : usize,
    store        : HiddenStore,
}


impl NativeTrayRegistry {

    pub const DEFAULT_CAPACITY : usize = 50;
    pub const FIRST_ICON_ID    : u32   = 1001;

    pub fn new (notify: Box<dyn NotifyArea>, store:HiddenStore, capacity:usize) -> NativeTrayRegistry {
        NativeTrayRegistry {
            notify, store,
            entries      : Vec::new(),
            next_icon_id : Self::FIRST_ICON_ID,
            capacity     : capacity.max(1),
        }
    }

    pub fn capacity (&self) -> usize { self.capacity }
    pub fn store    (&self) -> &HiddenStore { &self.store }
    pub fn entries  (&self) -> &[NativeEntry] { &self.entries }

    /// Resolves an activated icon back to the window it stands for
    pub fn handle_for_icon (&self, icon_id:u32) -> Option<Hwnd> {
        self.entries .iter() .find (|e| e.icon_id == icon_id) .map (|e| e.hwnd)
    }

    pub fn persist (&self) {
        self.store.save (self.entries.iter().map(|e| e.hwnd))
    }

    fn alloc_icon_id (&mut self) -> u32 {
        let id = self.next_icon_id;
        self.next_icon_id = self.next_icon_id.wrapping_add(1).max(Self::FIRST_ICON_ID);
        id
    }

    fn take_entry (&mut self, hwnd:Hwnd) -> Option<NativeEntry> {
        let idx = self.entries .iter() .position (|e| e.hwnd == hwnd)?;
        Some (self.entries.remove(idx))
    }

}


impl HidingBackend for NativeTrayRegistry {

    fn via (&self) -> HideVia { HideVia::native_tray }

    fn hide (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()> {
        if hwnd == 0 { return Err (TrayError::InvalidHandle) }
        if self.contains(hwnd) { return Err (TrayError::AlreadyHidden (hwnd)) }
        if self.entries.len() >= self.capacity { return Err (TrayError::CapacityReached (self.capacity)) }
        check_hideable (ws, hwnd)?;

        // the icon goes up before the window goes away, so a failure here leaves nothing behind
        let icon_id = self.alloc_icon_id();
        let tooltip = ws.window_text (hwnd);
        self.notify.add_icon (icon_id, hwnd, &tooltip)?;

        ws.hide_window (hwnd);
        self.entries.push (NativeEntry { hwnd, icon_id });
        self.persist();
        info! ("hid {:#x} to tray icon {} ({:?})", hwnd, icon_id, tooltip);
        Ok(())
    }

    fn restore (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()> {
        if !self.contains(hwnd) { return Err (TrayError::NotHidden (hwnd)) }
        let is_live = ws.is_live (hwnd);
        // a refused show keeps the icon, so the window can still be reached from the tray
        if is_live && !ws.show_and_foreground (hwnd) { return Err (TrayError::ShowRefused (hwnd)) }
        let Some(entry) = self.take_entry(hwnd) else { return Err (TrayError::NotHidden (hwnd)) };
        self.notify.remove_icon (entry.icon_id);
        self.persist();
        if !is_live {
            warn! ("dropping tray icon {} for {:#x} .. window no longer exists", entry.icon_id, hwnd);
            return Err (TrayError::WindowGone (hwnd))
        }
        info! ("restored {:#x} from tray icon {}", hwnd, entry.icon_id);
        Ok(())
    }

    fn restore_all (&mut self, ws:&dyn WindowSystem) -> usize {
        let mut n_shown = 0;
        for e in self.entries.drain(..) {
            if ws.is_live (e.hwnd) {
                if ws.show_and_foreground (e.hwnd) { n_shown += 1 }
                else { warn! ("window {:#x} refused to be shown on restore-all", e.hwnd) }
            } else {
                debug! ("skipping dead window {:#x} on restore-all", e.hwnd);
            }
            self.notify.remove_icon (e.icon_id);
        }
        self.store.clear();
        n_shown
    }

    fn contains (&self, hwnd:Hwnd) -> bool {
        self.entries .iter() .any (|e| e.hwnd == hwnd)
    }

    fn drop_stale (&mut self, _ws:&dyn WindowSystem, hwnd:Hwnd) -> bool {
        if let Some(e) = self.take_entry(hwnd) {
            self.notify.remove_icon (e.icon_id);
            self.persist();
            return true
        }
        false
    }

    fn hidden_hwnds (&self) -> Vec<Hwnd> {
        self.entries .iter() .map (|e| e.hwnd) .collect()
    }

    fn listing (&self, ws:&dyn WindowSystem) -> Vec<HiddenWindowInfo> {
        self.entries .iter() .filter (|e| ws.is_live(e.hwnd)) .map (|e| HiddenWindowInfo {
            hwnd         : e.hwnd,
            title        : ws.window_text (e.hwnd),
            process_name : ws.process_image_name (ws.window_pid(e.hwnd))
                               .unwrap_or_else (|| WindowSnapshot::UNKNOWN_PROCESS_STR.to_string()),
            via          : HideVia::native_tray,
        } ) .collect()
    }

    fn len (&self) -> usize { self.entries.len() }

}
