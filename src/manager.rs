use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app_tray::{parse_entry_id, AppTrayRegistry};
use crate::backend::{HiddenWindowInfo, HideVia, HidingBackend};
use crate::enumeration::{self, WindowSnapshot};
use crate::errors::{TrayError, TrayResult};
use crate::native_tray::NativeTrayRegistry;
use crate::platform::{Hwnd, WindowSystem};
use crate::recency::RecencyList;



/// Callback raised after every completed mutation of the hidden set. Carries no payload .. observers re-query.
pub type ChangeListener = Box <dyn Fn() + Send>;


pub struct TrayManager {
    ws        : Arc <dyn WindowSystem>,
    native    : NativeTrayRegistry,
    app_tray  : AppTrayRegistry,
    recency   : RecencyList,
    listeners : Vec <ChangeListener>,
}


fn log_failure (op:&str, hwnd:Hwnd, e:&TrayError) {
    if e.is_rejection() { debug! ("{} {:#x} rejected : {}", op, hwnd, e) }
    else { warn! ("{} {:#x} failed : {}", op, hwnd, e) }
}


impl TrayManager {

    pub fn new (ws: Arc<dyn WindowSystem>, native:NativeTrayRegistry, app_tray:AppTrayRegistry) -> TrayManager {
        TrayManager { ws, native, app_tray, recency: RecencyList::new(), listeners: Vec::new() }
    }

    pub fn window_system (&self) -> &dyn WindowSystem { &*self.ws }
    pub fn native   (&self) -> &NativeTrayRegistry { &self.native }
    pub fn app_tray (&self) -> &AppTrayRegistry { &self.app_tray }
    pub fn recency  (&self) -> &RecencyList { &self.recency }

    pub fn subscribe (&mut self, listener: impl Fn() + Send + 'static) {
        self.listeners.push (Box::new(listener))
    }
    fn notify_changed (&self) {
        self.listeners .iter() .for_each (|l| l())
    }


    fn backend (&self, via:HideVia) -> &dyn HidingBackend {
        match via { HideVia::native_tray => &self.native, HideVia::app_tray => &self.app_tray }
    }
    fn backend_mut (&mut self, via:HideVia) -> &mut dyn HidingBackend {
        match via { HideVia::native_tray => &mut self.native, HideVia::app_tray => &mut self.app_tray }
    }

    // native is always consulted first
    pub fn holder_of (&self, hwnd:Hwnd) -> Option<HideVia> {
        [HideVia::native_tray, HideVia::app_tray] .into_iter() .find (|&via| self.backend(via).contains(hwnd))
    }
    pub fn is_hidden (&self, hwnd:Hwnd) -> bool { self.holder_of(hwnd).is_some() }

    pub fn hidden_set (&self) -> HashSet<Hwnd> {
        self.native.hidden_hwnds() .into_iter() .chain (self.app_tray.hidden_hwnds()) .collect()
    }
    pub fn hidden_count (&self) -> usize { self.native.len() + self.app_tray.len() }



    /// Hides a window through the chosen mechanism. A handle already held by either registry is rejected untouched.
    pub fn hide (&mut self, hwnd:Hwnd, via:HideVia) -> TrayResult<()> {
        if let Some(holder) = self.holder_of(hwnd) {
            debug! ("{:#x} is already hidden via {}", hwnd, holder.str());
            return Err (TrayError::AlreadyHidden (hwnd))
        }
        let ws = self.ws.clone();
        if let Err(e) = self.backend_mut(via).hide (&*ws, hwnd) {
            log_failure ("hide", hwnd, &e);
            return Err(e)
        }
        self.recency.record_hidden (hwnd);
        self.reconcile_recency();
        self.notify_changed();
        Ok(())
    }

    pub fn restore (&mut self, hwnd:Hwnd) -> TrayResult<()> {
        let via = self.holder_of(hwnd) .ok_or (TrayError::NotHidden (hwnd))?;
        let ws = self.ws.clone();
        let res = self.backend_mut(via).restore (&*ws, hwnd);
        match &res {
            // a gone window still had its entry dropped, so the hidden set did change
            Ok(_) | Err(TrayError::WindowGone(_)) => {
                self.recency.record_restored (hwnd);
                self.reconcile_recency();
                self.notify_changed();
            }
            Err(_) => { }
        }
        if let Err(e) = &res { log_failure ("restore", hwnd, e) }
        res
    }

    pub fn restore_all (&mut self) -> usize {
        let ws = self.ws.clone();
        let n_native = self.native.restore_all (&*ws);
        let n_app    = self.app_tray.restore_all (&*ws);
        self.recency.clear();
        self.notify_changed();
        info! ("restored all .. {} from tray icons, {} from tray menu", n_native, n_app);
        n_native + n_app
    }

    /// Restores the most recently hidden window that is still alive, discarding dead ones on the way.
    /// If the restore itself fails, the handle goes back to the front of the recency order.
    pub fn restore_most_recent (&mut self) -> TrayResult<Hwnd> {
        let mut healed = false;
        for _ in 0 .. self.recency.len() {
            let Some(hwnd) = self.recency.pop_front() else { break };
            if !self.is_hidden (hwnd) {
                debug! ("discarding {:#x} from recency order .. no registry holds it", hwnd);
                continue
            }
            if !self.ws.is_live (hwnd) {
                debug! ("discarding dead {:#x} from recency order", hwnd);
                healed |= self.drop_stale (hwnd);
                continue
            }
            return match self.restore (hwnd) {
                Ok(_) => Ok(hwnd),
                Err(e) => {
                    if !matches! (e, TrayError::WindowGone(_)) { self.recency.push_front (hwnd) }
                    if healed { self.notify_changed() }
                    Err(e)
                }
            }
        }
        if healed { self.notify_changed() }
        Err (TrayError::NothingToRestore)
    }

    /// Recency may only reference handles a registry still holds .. menu rebuilds prune app-tray entries on their own
    fn reconcile_recency (&mut self) {
        let held = self.hidden_set();
        self.recency.retain (|h| held.contains(&h));
    }

    fn drop_stale (&mut self, hwnd:Hwnd) -> bool {
        let ws = self.ws.clone();
        let dropped_native = self.native.drop_stale (&*ws, hwnd);
        let dropped_app    = self.app_tray.drop_stale (&*ws, hwnd);
        dropped_native || dropped_app
    }


    /// Entry point for the hide hotkey: sends the current foreground window to a tray icon, unless it is one of ours
    pub fn hide_foreground (&mut self) -> TrayResult<Hwnd> {
        let hwnd = self.ws.foreground_window() .filter (|&h| h != 0) .ok_or (TrayError::InvalidHandle)?;
        if self.ws.window_pid(hwnd) == self.ws.current_pid() {
            return Err (TrayError::Protected (self.ws.class_name(hwnd).unwrap_or_default()))
        }
        self.hide (hwnd, HideVia::native_tray) .map (|_| hwnd)
    }


    /// Re-hides the windows a previous session left recorded, through the normal hide path.
    /// Dead or unparseable records are skipped silently. Returns how many came back.
    pub fn recover_persisted (&mut self) -> usize {
        let recorded = self.native.store().load();
        let n_recorded = recorded.len();
        let mut n_recovered = 0;
        for hwnd in recorded {
            if !self.ws.is_live (hwnd) {
                debug! ("skipping recorded {:#x} .. no longer a live window", hwnd);
                continue
            }
            if self.hide (hwnd, HideVia::native_tray) .is_ok() { n_recovered += 1 }
        }
        if n_recorded > 0 {
            // whatever did not come back should not linger in the record either
            self.native.persist();
            info! ("recovered {} of {} recorded hidden windows", n_recovered, n_recorded);
        }
        n_recovered
    }


    pub fn on_icon_activated (&mut self, icon_id:u32) -> TrayResult<()> {
        let hwnd = self.native.handle_for_icon(icon_id) .ok_or (TrayError::InvalidHandle)?;
        self.restore (hwnd)
    }

    pub fn on_menu_entry_activated (&mut self, entry_id:&str) -> TrayResult<()> {
        let hwnd = self.app_tray.handle_for_entry(entry_id) .or_else (|| parse_entry_id(entry_id))
            .ok_or (TrayError::InvalidHandle)?;
        self.restore (hwnd)
    }


    pub fn sync_menu (&mut self) -> TrayResult<()> {
        let ws = self.ws.clone();
        let res = self.app_tray.rebuild_menu (&*ws);
        self.reconcile_recency();
        res
    }

    pub fn hidden_windows (&self) -> Vec<HiddenWindowInfo> {
        let mut listing = self.native.listing (&*self.ws);
        listing.extend (self.app_tray.listing (&*self.ws));
        listing
    }

    pub fn snapshot (&self) -> Vec<WindowSnapshot> {
        enumeration::snapshot (&*self.ws, &self.hidden_set())
    }

    /// Restores everything on the way out, so nothing stays stranded once the icons and menu are gone
    pub fn shutdown (&mut self) -> usize {
        if self.hidden_count() == 0 { return 0 }
        self.restore_all()
    }

}
