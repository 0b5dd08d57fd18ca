use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, sleep, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{HiddenWindowInfo, HideVia};
use crate::app_tray::{MENU_OPEN_MAIN, MENU_QUIT, MENU_RESTORE_ALL, MENU_RESTORE_LAST};
use crate::enumeration::WindowSnapshot;
use crate::errors::TrayError;
use crate::manager::TrayManager;
use crate::platform::Hwnd;
use crate::refresh::{RefreshGate, RefreshTracker};
use crate::window_ops;



# [ derive (Debug, Default, Clone) ]
/// pure sugar for representation of our atomic-bool flags
pub struct Flag (Arc <AtomicBool>);

impl Flag {
    pub fn new (state:bool) -> Flag { Flag ( Arc::new ( AtomicBool::new(state) ) ) }

    pub fn set   (&self) { self.0 .store (true,  Ordering::SeqCst) }
    pub fn clear (&self) { self.0 .store (false, Ordering::SeqCst) }

    pub fn is_set   (&self) -> bool { self.0 .load (Ordering::SeqCst) }
    pub fn is_clear (&self) -> bool { !self.0 .load (Ordering::SeqCst) }

    /// clears the flag, returning whether it had been set
    pub fn take (&self) -> bool { self.0 .swap (false, Ordering::SeqCst) }
}



# [ derive (Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize) ]
pub enum WindowAction {
    BringToFront,
    ToggleTopmost,
    Opacity (u8),
    Highlight,
    EndTask,
}


# [ derive (Debug, Eq, PartialEq, Clone) ]
pub enum ControlEvent {
    IconActivated (u32),
    /// any id from the app tray menu .. the fixed actions as well as hidden-window entries
    MenuEntryActivated (String),
    HotkeyFired,
    HideRequested { hwnd: Hwnd, via: HideVia },
    RestoreRequested (Hwnd),
    RestoreLastRequested,
    RestoreAllRequested,
    WindowActionRequested { hwnd: Hwnd, action: WindowAction },
    ContextMenuOpened,
    ContextMenuClosed,
    RefreshTick,
    /// an explicit refresh, which is always presented even if nothing changed (e.g. on front-end load)
    RefreshRequested,
    SettingsChanged (ControlSettings),
    Shutdown,
}


# [ derive (Debug, Eq, PartialEq, Clone, Copy) ]
pub struct ControlSettings {
    pub hotkey_enabled       : bool,
    pub auto_refresh_enabled : bool,
    pub refresh_interval     : Duration,
}

impl Default for ControlSettings {
    fn default () -> Self {
        ControlSettings { hotkey_enabled: true, auto_refresh_enabled: true, refresh_interval: Duration::from_millis(500) }
    }
}



/// The UI side of the control loop .. whatever renders lists and tells the user about failures
pub trait Presenter : Send {
    fn present_windows (&mut self, windows:&[WindowSnapshot]);
    fn present_hidden  (&mut self, hidden:&[HiddenWindowInfo]);
    fn report_failure  (&mut self, op:&str, err:&TrayError);
    fn show_main       (&mut self);
    fn request_exit    (&mut self);
}




# [ derive (Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize) ]
/// Requests from the front end, arriving as json on the `frontend_request` event
pub struct FrontendRequest {
    pub req    : String,
    #[serde(default)]
    pub hwnd   : Option<i64>,
    #[serde(default)]
    pub params : Vec<String>,
}

impl FrontendRequest {

    /// Maps a front-end request onto the control event it stands for. Requests that need a handle and lack one map to None.
    pub fn to_control_event (&self) -> Option<ControlEvent> {
        use ControlEvent::*;
        let hwnd = self.hwnd .map (|h| h as Hwnd) .filter (|&h| h != 0);
        let with_hwnd = |f: fn(Hwnd) -> ControlEvent| hwnd.map(f);
        let action = |action:WindowAction| hwnd.map (|hwnd| WindowActionRequested { hwnd, action });

        match self.req.as_str() {
            "fe_req_hide_to_tray"      => with_hwnd (|hwnd| HideRequested { hwnd, via: HideVia::native_tray }),
            "fe_req_hide_to_menu"      => with_hwnd (|hwnd| HideRequested { hwnd, via: HideVia::app_tray }),
            "fe_req_restore"           => with_hwnd (RestoreRequested),
            "fe_req_restore_last"      => Some (RestoreLastRequested),
            "fe_req_restore_all"       => Some (RestoreAllRequested),

            "fe_req_bring_to_front"    => action (WindowAction::BringToFront),
            "fe_req_toggle_topmost"    => action (WindowAction::ToggleTopmost),
            "fe_req_highlight"         => action (WindowAction::Highlight),
            "fe_req_end_task"          => action (WindowAction::EndTask),
            "fe_req_set_opacity"       => {
                let percent = self.params.first() .and_then (|p| p.trim().parse::<u8>().ok())?;
                action (WindowAction::Opacity (percent))
            }

            "fe_req_context_menu_open"  => Some (ContextMenuOpened),
            "fe_req_context_menu_close" => Some (ContextMenuClosed),
            "fe_req_refresh"            => Some (RefreshRequested),
            "fe_req_data_load"          => Some (RefreshRequested),

            _ => { debug! ("unrecognized frontend request: {}", self.req); None }
        }
    }
}




// sole owner of the TrayManager .. lives on the control thread once spawned
pub struct ControlLoop {
    mgr       : TrayManager,
    presenter : Box <dyn Presenter>,
    settings  : ControlSettings,
    tracker   : RefreshTracker,
    gate      : RefreshGate,
    changed   : Flag,
}

impl ControlLoop {

    pub fn new (mut mgr:TrayManager, presenter: Box<dyn Presenter>, settings:ControlSettings) -> ControlLoop {
        let changed = Flag::default();
        mgr.subscribe ({ let changed = changed.clone(); move || changed.set() });
        ControlLoop { mgr, presenter, settings, tracker: RefreshTracker::new(), gate: RefreshGate::new(), changed }
    }

    pub fn manager  (&self) -> &TrayManager { &self.mgr }
    pub fn settings (&self) -> &ControlSettings { &self.settings }
    pub fn gate     (&self) -> &RefreshGate { &self.gate }


    /// Applies the initial menu, re-hides what a previous session left recorded, then presents the first lists
    pub fn startup (&mut self) {
        if let Err(e) = self.mgr.sync_menu() { self.fail ("menu setup", e) }
        let n = self.mgr.recover_persisted();
        info! ("control loop starting .. {} windows recovered from last session", n);
        self.changed.clear();
        self.present_hidden();
        self.refresh (true);
    }

    /// Handles one event. Returns false once the loop should stop.
    pub fn handle (&mut self, ev:ControlEvent) -> bool {
        use ControlEvent::*;
        let mut keep_running = true;
        match ev {
            IconActivated (icon_id)   => { let r = self.mgr.on_icon_activated (icon_id);  self.check ("restore", r) }
            MenuEntryActivated (id)   => { keep_running = self.handle_menu_entry (&id) }
            HotkeyFired               => {
                if self.settings.hotkey_enabled {
                    let r = self.mgr.hide_foreground();
                    self.check ("hide", r)
                } else { debug! ("hide hotkey ignored .. hotkeys disabled") }
            }
            HideRequested { hwnd, via } => { let r = self.mgr.hide (hwnd, via);     self.check ("hide", r) }
            RestoreRequested (hwnd)     => { let r = self.mgr.restore (hwnd);       self.check ("restore", r) }
            RestoreLastRequested        => { let r = self.mgr.restore_most_recent(); self.check ("restore last", r) }
            RestoreAllRequested         => { self.mgr.restore_all(); }
            WindowActionRequested { hwnd, action } => { self.handle_window_action (hwnd, action) }

            ContextMenuOpened => { self.gate.pause() }
            ContextMenuClosed => { if self.gate.resume() { self.refresh (false) } }

            RefreshTick => {
                if self.settings.auto_refresh_enabled && self.gate.try_pass() { self.refresh (false) }
            }
            RefreshRequested => {
                self.tracker.invalidate();
                self.present_hidden();
                if self.gate.try_pass() { self.refresh (true) }
            }
            SettingsChanged (s) => {
                info! ("control settings updated : {:?}", s);
                self.settings = s;
            }
            Shutdown => {
                self.mgr.shutdown();
                keep_running = false;
            }
        }
        self.after_event();
        keep_running
    }

    fn handle_menu_entry (&mut self, id:&str) -> bool {
        match id {
            MENU_OPEN_MAIN    => { self.presenter.show_main() }
            MENU_RESTORE_LAST => { let r = self.mgr.restore_most_recent(); self.check ("restore last", r) }
            MENU_RESTORE_ALL  => { self.mgr.restore_all(); }
            MENU_QUIT         => {
                self.mgr.shutdown();
                self.after_event();
                self.presenter.request_exit();
                return false
            }
            _ => { let r = self.mgr.on_menu_entry_activated (id); self.check ("restore", r) }
        }
        true
    }

    fn handle_window_action (&mut self, hwnd:Hwnd, action:WindowAction) {
        let ws = self.mgr.window_system();
        let res = match action {
            WindowAction::BringToFront   => window_ops::bring_to_front (ws, hwnd),
            WindowAction::ToggleTopmost  => window_ops::toggle_topmost (ws, hwnd) .map (|_| ()),
            WindowAction::Opacity (p)    => window_ops::set_opacity (ws, hwnd, p) .map (|_| ()),
            WindowAction::Highlight      => window_ops::highlight (ws, hwnd),
            WindowAction::EndTask        => window_ops::end_task (ws, hwnd) .map (|_| ()),
        };
        match res {
            Ok(_)  => if action == WindowAction::EndTask && self.gate.try_pass() { self.refresh (false) },
            Err(e) => self.fail (&format!("{:?}", action), e),
        }
    }

    fn check <T> (&mut self, op:&str, res: Result<T, TrayError>) {
        if let Err(e) = res { self.fail (op, e) }
    }
    fn fail (&mut self, op:&str, e:TrayError) {
        if e.is_rejection() { info! ("{} rejected : {}", op, e) } else { warn! ("{} failed : {}", op, e) }
        self.presenter.report_failure (op, &e);
    }

    /// A change to the hidden set re-pushes the hidden list and forces the next enumeration to be presented
    fn after_event (&mut self) {
        if !self.changed.take() { return }
        self.present_hidden();
        self.tracker.invalidate();
        if self.gate.try_pass() { self.refresh (false) }
    }

    fn present_hidden (&mut self) {
        let hidden = self.mgr.hidden_windows();
        self.presenter.present_hidden (&hidden);
    }

    fn refresh (&mut self, force:bool) {
        if force { self.tracker.invalidate() }
        let snap = self.mgr.snapshot();
        if let Some(list) = self.tracker.update (snap) {
            self.presenter.present_windows (list);
        }
    }


    /// Drains the channel until a shutdown arrives or every sender is gone. Either way, hidden windows are restored.
    pub fn run (mut self, rx: Receiver<ControlEvent>) {
        self.startup();
        while let Ok(ev) = rx.recv() {
            if !self.handle(ev) { break }
        }
        self.mgr.shutdown();
        info! ("control loop exited");
    }

}



# [ derive (Clone) ]
pub struct ControlHandle ( Arc <_ControlHandle> );

pub struct _ControlHandle {
    pub tx      : Sender <ControlEvent>,
    pub ticker  : Flag,
    pub stopped : Flag,
    join        : std::sync::Mutex <Option <JoinHandle<()>>>,
}

impl Deref for ControlHandle {
    type Target = _ControlHandle;
    fn deref (&self) -> &_ControlHandle { &self.0 }
}

impl ControlHandle {

    /// Spawns the control thread (and the refresh ticker, if enabled) around an already-built loop
    pub fn spawn (ctl:ControlLoop, tx:Sender<ControlEvent>, rx:Receiver<ControlEvent>) -> ControlHandle {
        let ticker_stop = Flag::default();
        let settings = *ctl.settings();
        spawn_ticker (tx.clone(), settings.refresh_interval, ticker_stop.clone());
        let join = thread::Builder::new() .name ("traynex-control".into())
            .spawn (move || ctl.run(rx)) .ok();
        if join.is_none() { warn! ("failed to spawn control thread") }
        ControlHandle ( Arc::new ( _ControlHandle {
            tx, ticker: ticker_stop, stopped: Flag::default(), join: std::sync::Mutex::new(join)
        } ) )
    }

    pub fn send (&self, ev:ControlEvent) {
        if let Err(e) = self.tx.send (ev) {
            warn! ("control loop is gone, dropped event : {:?}", e.0);
        }
    }

    /// Asks the loop to restore everything and stop, then waits for it.
    /// Must not be called from the thread the loop's menu updates are delivered on, as those would then never land.
    pub fn shutdown_and_wait (&self) {
        self.ticker.set();
        let _ = self.tx.send (ControlEvent::Shutdown);
        if let Some(j) = self.join.lock().unwrap().take() {
            let _ = j.join();
        }
        self.stopped.set();
    }

    pub fn is_stopped (&self) -> bool { self.stopped.is_set() }

}


/// Sends a refresh tick at every interval until stopped or the loop goes away
pub fn spawn_ticker (tx:Sender<ControlEvent>, interval:Duration, stop:Flag) -> Option<JoinHandle<()>> {
    let interval = interval.max (Duration::from_millis(100));
    thread::Builder::new() .name ("traynex-ticker".into()) .spawn ( move || {
        loop {
            sleep (interval);
            if stop.is_set() || tx.send (ControlEvent::RefreshTick).is_err() { break }
        }
    } ) .ok()
}
