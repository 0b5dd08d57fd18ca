//! In-memory stand-ins for the desktop, the notification area and the tray menu, shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use traynex::app_tray::{AppTrayRegistry, MenuSlot};
use traynex::backend::HiddenWindowInfo;
use traynex::control::Presenter;
use traynex::enumeration::WindowSnapshot;
use traynex::errors::TrayError;
use traynex::manager::TrayManager;
use traynex::native_tray::NativeTrayRegistry;
use traynex::persistence::HiddenStore;
use traynex::platform::{Hwnd, IconSource, MenuSink, NotifyArea, RawWindow, WindowSystem};


pub const SELF_PID : u32 = 4242;


#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub raw     : RawWindow,
    pub title   : String,
    pub topmost : bool,
    pub alpha   : Option<u8>,
    pub flashes : usize,
}

#[derive(Debug, Default)]
pub struct World {
    pub windows    : BTreeMap<Hwnd, FakeWindow>,
    // enumeration order, as the OS would hand it to us
    pub z_order    : Vec<Hwnd>,
    pub processes  : BTreeMap<u32, String>,
    pub foreground : Option<Hwnd>,
    pub terminated : Vec<u32>,
    pub shown      : Vec<Hwnd>,
    pub hidden     : Vec<Hwnd>,
    // windows whose thread will not take a show request (hung, or elevated above us)
    pub stubborn   : Vec<Hwnd>,
}

#[derive(Debug, Default, Clone)]
pub struct FakeWorld (pub Arc<Mutex<World>>);

impl FakeWorld {

    pub fn new () -> FakeWorld { FakeWorld::default() }

    /// Adds a plain, visible, taskbar-worthy application window
    pub fn add_window (&self, hwnd:Hwnd, title:&str, class_name:&str, pid:u32, exe:&str) -> &Self {
        let mut w = self.0.lock().unwrap();
        w.windows.insert (hwnd, FakeWindow {
            raw : RawWindow {
                hwnd, is_live: true, is_visible: true, pid, class_name: class_name.to_string(), ..Default::default()
            },
            title   : title.to_string(),
            topmost : false,
            alpha   : None,
            flashes : 0,
        });
        w.z_order.push (hwnd);
        w.processes.insert (pid, exe.to_string());
        self
    }

    pub fn edit (&self, hwnd:Hwnd, f: impl FnOnce(&mut FakeWindow)) {
        if let Some(fw) = self.0.lock().unwrap().windows.get_mut (&hwnd) { f(fw) }
    }

    /// The window is destroyed behind our back
    pub fn kill (&self, hwnd:Hwnd) {
        self.edit (hwnd, |fw| { fw.raw.is_live = false; fw.raw.is_visible = false; });
    }

    pub fn set_title (&self, hwnd:Hwnd, title:&str) {
        self.edit (hwnd, |fw| fw.title = title.to_string());
    }

    pub fn make_stubborn (&self, hwnd:Hwnd, stubborn:bool) {
        let mut w = self.0.lock().unwrap();
        w.stubborn.retain (|&h| h != hwnd);
        if stubborn { w.stubborn.push (hwnd) }
    }

    /// The OS hands a dead window's handle value to a brand new window
    pub fn reuse_handle (&self, hwnd:Hwnd) {
        self.edit (hwnd, |fw| { fw.raw.is_live = true; fw.raw.is_visible = true; });
    }

    pub fn set_foreground (&self, hwnd:Hwnd) {
        self.0.lock().unwrap().foreground = Some(hwnd);
    }

    pub fn is_visible (&self, hwnd:Hwnd) -> bool {
        self.0.lock().unwrap().windows.get(&hwnd) .map (|fw| fw.raw.is_visible) .unwrap_or(false)
    }

    pub fn window (&self, hwnd:Hwnd) -> Option<FakeWindow> {
        self.0.lock().unwrap().windows.get(&hwnd).cloned()
    }

    pub fn shown (&self) -> Vec<Hwnd> { self.0.lock().unwrap().shown.clone() }
    pub fn terminated (&self) -> Vec<u32> { self.0.lock().unwrap().terminated.clone() }

    fn live_window <T> (&self, hwnd:Hwnd, f: impl FnOnce(&mut FakeWindow) -> T) -> Option<T> {
        let mut w = self.0.lock().unwrap();
        w.windows.get_mut(&hwnd) .filter (|fw| fw.raw.is_live) .map (f)
    }
}

impl WindowSystem for FakeWorld {

    fn enum_top_level (&self) -> Vec<RawWindow> {
        let w = self.0.lock().unwrap();
        w.z_order.iter() .filter_map (|h| w.windows.get(h)) .map (|fw| fw.raw.clone()) .collect()
    }

    fn is_live (&self, hwnd:Hwnd) -> bool {
        self.0.lock().unwrap().windows.get(&hwnd) .is_some_and (|fw| fw.raw.is_live)
    }

    fn class_name (&self, hwnd:Hwnd) -> Option<String> {
        self.live_window (hwnd, |fw| fw.raw.class_name.clone())
    }

    fn window_text (&self, hwnd:Hwnd) -> String {
        self.live_window (hwnd, |fw| fw.title.clone()) .unwrap_or_default()
    }

    fn window_pid (&self, hwnd:Hwnd) -> u32 {
        self.live_window (hwnd, |fw| fw.raw.pid) .unwrap_or(0)
    }

    fn process_image_name (&self, pid:u32) -> Option<String> {
        self.0.lock().unwrap().processes.get(&pid).cloned()
    }

    fn icon_source (&self, hwnd:Hwnd, _pid:u32) -> Option<IconSource> {
        Some (IconSource::Window (hwnd * 10))
    }

    fn current_pid (&self) -> u32 { SELF_PID }

    fn foreground_window (&self) -> Option<Hwnd> { self.0.lock().unwrap().foreground }

    fn hide_window (&self, hwnd:Hwnd) {
        let mut w = self.0.lock().unwrap();
        if let Some(fw) = w.windows.get_mut(&hwnd) { fw.raw.is_visible = false }
        w.hidden.push (hwnd);
    }

    fn show_and_foreground (&self, hwnd:Hwnd) -> bool {
        let mut w = self.0.lock().unwrap();
        if w.stubborn.contains (&hwnd) { return false }
        if let Some(fw) = w.windows.get_mut(&hwnd) { fw.raw.is_visible = true }
        w.shown.push (hwnd);
        w.foreground = Some(hwnd);
        true
    }

    fn bring_to_front (&self, hwnd:Hwnd) {
        self.0.lock().unwrap().foreground = Some(hwnd);
    }

    fn is_topmost (&self, hwnd:Hwnd) -> bool {
        self.live_window (hwnd, |fw| fw.topmost) .unwrap_or(false)
    }

    fn set_topmost (&self, hwnd:Hwnd, on_top:bool) -> bool {
        self.live_window (hwnd, |fw| fw.topmost = on_top) .is_some()
    }

    fn set_opacity_alpha (&self, hwnd:Hwnd, alpha:u8) -> bool {
        self.live_window (hwnd, |fw| fw.alpha = Some(alpha)) .is_some()
    }

    fn flash (&self, hwnd:Hwnd) {
        self.live_window (hwnd, |fw| fw.flashes += 1);
    }

    fn terminate_process (&self, pid:u32) -> bool {
        let mut w = self.0.lock().unwrap();
        w.windows.values_mut() .filter (|fw| fw.raw.pid == pid) .for_each (|fw| {
            fw.raw.is_live = false;
            fw.raw.is_visible = false;
        });
        w.terminated.push (pid);
        true
    }
}




#[derive(Debug, Default)]
pub struct NotifyState {
    pub icons   : BTreeMap<u32, (Hwnd, String)>,
    pub refuse  : bool,
    pub added   : usize,
    pub removed : usize,
}

/// Notification area that can be told to refuse new icons
#[derive(Debug, Default, Clone)]
pub struct FakeNotify (pub Arc<Mutex<NotifyState>>);

impl FakeNotify {
    pub fn refuse (&self, refuse:bool) { self.0.lock().unwrap().refuse = refuse }
    pub fn icon_ids (&self) -> Vec<u32> { self.0.lock().unwrap().icons.keys().copied().collect() }
    pub fn icon_for (&self, hwnd:Hwnd) -> Option<u32> {
        self.0.lock().unwrap().icons.iter() .find (|(_, (h, _))| *h == hwnd) .map (|(id, _)| *id)
    }
    pub fn tooltip (&self, icon_id:u32) -> Option<String> {
        self.0.lock().unwrap().icons.get(&icon_id) .map (|(_, t)| t.clone())
    }
    pub fn count (&self) -> usize { self.0.lock().unwrap().icons.len() }
}

impl NotifyArea for FakeNotify {
    fn add_icon (&mut self, icon_id:u32, target:Hwnd, tooltip:&str) -> Result<(), TrayError> {
        let mut s = self.0.lock().unwrap();
        if s.refuse { return Err (TrayError::IconRegistration ("shell refused".into())) }
        s.icons.insert (icon_id, (target, tooltip.to_string()));
        s.added += 1;
        Ok(())
    }
    fn remove_icon (&mut self, icon_id:u32) {
        let mut s = self.0.lock().unwrap();
        if s.icons.remove (&icon_id).is_some() { s.removed += 1 }
    }
}




#[derive(Debug, Default)]
pub struct MenuState {
    pub layouts : Vec<Vec<MenuSlot>>,
    pub refuse  : bool,
}

/// Tray menu that records every layout applied to it
#[derive(Debug, Default, Clone)]
pub struct FakeMenu (pub Arc<Mutex<MenuState>>);

impl FakeMenu {
    pub fn refuse (&self, refuse:bool) { self.0.lock().unwrap().refuse = refuse }
    pub fn current (&self) -> Vec<MenuSlot> { self.0.lock().unwrap().layouts.last().cloned().unwrap_or_default() }
    pub fn applied (&self) -> usize { self.0.lock().unwrap().layouts.len() }

    /// ids of the dynamic entries, i.e. whatever sits between the first two separators
    pub fn entry_ids (&self) -> Vec<String> {
        self.current() .iter()
            .skip_while (|s| **s != MenuSlot::Separator) .skip(1)
            .take_while (|s| **s != MenuSlot::Separator)
            .filter_map (|s| s.id().map (|id| id.to_string()))
            .collect()
    }
    pub fn labels (&self) -> Vec<String> {
        self.current() .iter() .filter_map (|s| match s {
            MenuSlot::Item { label, .. } => Some(label.clone()),
            MenuSlot::Separator => None,
        } ) .collect()
    }
}

impl MenuSink for FakeMenu {
    fn apply_layout (&mut self, layout:&[MenuSlot]) -> Result<(), TrayError> {
        let mut s = self.0.lock().unwrap();
        if s.refuse { return Err (TrayError::MenuUpdate ("menu insertion failed".into())) }
        s.layouts.push (layout.to_vec());
        Ok(())
    }
}




#[derive(Debug, Default)]
pub struct PresenterLog {
    pub windows   : Vec<Vec<WindowSnapshot>>,
    pub hidden    : Vec<Vec<HiddenWindowInfo>>,
    pub failures  : Vec<(String, String)>,
    pub show_main : usize,
    pub exit      : bool,
}

#[derive(Debug, Default, Clone)]
pub struct RecordingPresenter (pub Arc<Mutex<PresenterLog>>);

impl RecordingPresenter {
    pub fn window_pushes (&self) -> usize { self.0.lock().unwrap().windows.len() }
    pub fn last_windows (&self) -> Vec<WindowSnapshot> {
        self.0.lock().unwrap().windows.last().cloned().unwrap_or_default()
    }
    pub fn last_hidden (&self) -> Vec<HiddenWindowInfo> {
        self.0.lock().unwrap().hidden.last().cloned().unwrap_or_default()
    }
    pub fn failures (&self) -> Vec<(String, String)> { self.0.lock().unwrap().failures.clone() }
}

impl Presenter for RecordingPresenter {
    fn present_windows (&mut self, windows:&[WindowSnapshot]) { self.0.lock().unwrap().windows.push (windows.to_vec()) }
    fn present_hidden (&mut self, hidden:&[HiddenWindowInfo]) { self.0.lock().unwrap().hidden.push (hidden.to_vec()) }
    fn report_failure (&mut self, op:&str, err:&TrayError) {
        self.0.lock().unwrap().failures.push ((op.to_string(), err.to_string()))
    }
    fn show_main (&mut self) { self.0.lock().unwrap().show_main += 1 }
    fn request_exit (&mut self) { self.0.lock().unwrap().exit = true }
}




/// A manager wired to fresh fakes, with its hidden record in a private temp dir
pub struct Rig {
    pub world  : FakeWorld,
    pub notify : FakeNotify,
    pub menu   : FakeMenu,
    pub store  : HiddenStore,
    pub dir    : TempDir,
}

impl Rig {

    pub fn new () -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let store = HiddenStore::new (dir.path().join (HiddenStore::DEFAULT_FILE_NAME));
        Rig { world: FakeWorld::new(), notify: FakeNotify::default(), menu: FakeMenu::default(), store, dir }
    }

    /// Three ordinary windows from different processes
    pub fn with_windows () -> Rig {
        let rig = Rig::new();
        rig.world
            .add_window (0x100, "Untitled - Notepad", "Notepad", 11, "notepad.exe")
            .add_window (0x200, "Inbox - Mail", "MailWnd", 22, "mail.exe")
            .add_window (0x300, "Calculator", "CalcFrame", 33, "calc.exe");
        rig
    }

    pub fn manager (&self) -> TrayManager {
        self.manager_with_capacity (NativeTrayRegistry::DEFAULT_CAPACITY)
    }

    pub fn manager_with_capacity (&self, capacity:usize) -> TrayManager {
        let native = NativeTrayRegistry::new (Box::new (self.notify.clone()), self.store.clone(), capacity);
        let app_tray = AppTrayRegistry::new (Box::new (self.menu.clone()));
        TrayManager::new (Arc::new (self.world.clone()), native, app_tray)
    }

    /// Counts change notifications raised by the manager
    pub fn counter (mgr:&mut TrayManager) -> Arc<Mutex<usize>> {
        let n = Arc::new (Mutex::new (0usize));
        let nc = n.clone();
        mgr.subscribe (move || *nc.lock().unwrap() += 1);
        n
    }
}
