#![ allow (non_snake_case, non_camel_case_types) ]

use std::sync::mpsc;

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use tracing::{debug, error, info, warn};

use tauri::menu::{Menu, MenuBuilder};
use tauri::tray::TrayIconBuilder;
use tauri::{AppHandle, Emitter, Listener, Manager, RunEvent, WindowEvent, Wry};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};
use windows::core::{w, PCWSTR};

use crate::app_tray::{AppTrayRegistry, MenuSlot};
use crate::backend::HiddenWindowInfo;
use crate::config::Config;
use crate::control::{ControlEvent, ControlHandle, ControlLoop, FrontendRequest, Presenter};
use crate::enumeration::WindowSnapshot;
use crate::errors::TrayError;
use crate::manager::TrayManager;
use crate::native_tray::NativeTrayRegistry;
use crate::persistence::HiddenStore;
use crate::platform::MenuSink;
use crate::win_apis;
use crate::win_platform::{NotifyIconHost, WinOs};



/// id of the application's own tray icon, the one carrying the hidden-windows menu
pub const TRAY_ID : &str = "main";

const MAIN_WINDOW : &str = "main";



#[derive (Debug, Eq, PartialEq, Hash, Copy, Clone, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend_Event {
    updated_window_list,
    updated_hidden_list,
    backend_notice,
}
impl Backend_Event {
    fn str (&self) -> &str { self.as_ref() }
}

# [ derive (Debug, Eq, PartialEq, Hash, Default, Clone, Serialize, Deserialize) ]
struct BackendNotice_Pl {
    op  : String,
    msg : String,
}




/// The tray menu of our own tray icon .. every layout is built fresh and swapped in whole
pub struct TauriTrayMenu {
    ah : AppHandle<Wry>,
}

fn build_menu (ah:&AppHandle<Wry>, layout:&[MenuSlot]) -> tauri::Result <Menu<Wry>> {
    layout .iter() .fold ( MenuBuilder::new(ah), |mb, slot| match slot {
        MenuSlot::Item { id, label } => mb.text (id.as_str(), label),
        MenuSlot::Separator          => mb.separator(),
    } ) .build()
}

impl MenuSink for TauriTrayMenu {
    fn apply_layout (&mut self, layout:&[MenuSlot]) -> Result<(), TrayError> {
        let tray = self.ah.tray_by_id (TRAY_ID) .ok_or_else (|| TrayError::MenuUpdate ("tray icon is missing".into()))?;
        let menu = build_menu (&self.ah, layout) .map_err (|e| TrayError::MenuUpdate (e.to_string()))?;
        tray.set_menu (Some(menu)) .map_err (|e| TrayError::MenuUpdate (e.to_string()))
    }
}




/// Pushes control loop output to the front end
pub struct TauriPresenter {
    ah : AppHandle<Wry>,
}

impl TauriPresenter {
    fn emit <P: Serialize + Clone> (&self, ev:Backend_Event, pl:P) {
        if let Err(e) = self.ah.emit (ev.str(), pl) {
            warn! ("{} emit failed: {:?}", ev.str(), e);
        }
    }
}

impl Presenter for TauriPresenter {
    fn present_windows (&mut self, windows:&[WindowSnapshot]) {
        debug! ("emitting window list of {} entries", windows.len());
        self.emit (Backend_Event::updated_window_list, windows.to_vec());
    }
    fn present_hidden (&mut self, hidden:&[HiddenWindowInfo]) {
        self.emit (Backend_Event::updated_hidden_list, hidden.to_vec());
    }
    fn report_failure (&mut self, op:&str, err:&TrayError) {
        let pl = BackendNotice_Pl { op: op.to_string(), msg: err.to_string() };
        self.emit (Backend_Event::backend_notice, pl);
    }
    fn show_main (&mut self) {
        if let Some(w) = self.ah.get_webview_window (MAIN_WINDOW) {
            let _ = w.show();
            let _ = w.unminimize();
            let _ = w.set_focus();
        }
    }
    fn request_exit (&mut self) {
        self.ah.exit(0);
    }
}




/// Held by the running instance .. a second one would re-hide the windows the first still holds from the shared record
const INSTANCE_MUTEX_NAME : PCWSTR = w!("Traynex_SingleInstance_Mutex");

pub fn run_traynex_tauri (conf:&Config) {

    let Some(_instance) = win_apis::claim_instance_mutex (INSTANCE_MUTEX_NAME) else {
        warn! ("another Traynex instance is already running .. exiting");
        return
    };

    let app = tauri::Builder::default()
        .plugin ( tauri_plugin_global_shortcut::Builder::new().build() )
        .setup ( {
            let conf = conf.clone();
            move |app| {
                let ah = app.handle().clone();

                // our own tray icon has to exist before the control loop applies its first menu layout
                let mut tray = TrayIconBuilder::with_id (TRAY_ID) .tooltip ("Traynex");
                if let Some(icon) = app.default_window_icon() { tray = tray.icon (icon.clone()) }
                tray .on_menu_event ( |ah, event| {
                    send_control_event (ah, ControlEvent::MenuEntryActivated (event.id.as_ref().to_string()))
                } ) .build (app)?;

                let ctl = start_control_loop (&ah, &conf)?;
                ah.manage (ctl);

                setup_global_shortcuts (&ah, &conf);
                setup_front_end_listener (&ah, &conf);

                // we'll setup the main window always-on-top behavior based on configs
                if let Some(w) = app.get_webview_window (MAIN_WINDOW) {
                    let _ = w.set_always_on_top (conf.check_flag__always_on_top());
                }
                Ok(())
            }
        } )
        .build (tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(e)  => { error! ("error while building tauri application: {:?}", e); return }
    };

    // now lets finally actually start the app! .. note that the run call wont return!
    app .run ( tauri_run_events_handler );
}


fn start_control_loop (ah:&AppHandle<Wry>, conf:&Config) -> Result <ControlHandle, Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel::<ControlEvent>();

    let notify = NotifyIconHost::start (tx.clone())?;
    let native = NativeTrayRegistry::new (
        Box::new (notify), HiddenStore::new (conf.get_save_file()), conf.get_max_hidden_windows()
    );
    let app_tray = AppTrayRegistry::new ( Box::new ( TauriTrayMenu { ah: ah.clone() } ) );
    let mgr = TrayManager::new ( std::sync::Arc::new (WinOs), native, app_tray );

    let presenter = Box::new ( TauriPresenter { ah: ah.clone() } );
    let ctl = ControlLoop::new (mgr, presenter, conf.control_settings());

    info! ("starting control loop with {:?}", conf.control_settings());
    Ok ( ControlHandle::spawn (ctl, tx, rx) )
}

fn send_control_event (ah:&AppHandle<Wry>, ev:ControlEvent) {
    match ah.try_state::<ControlHandle>() {
        Some(ctl) => ctl.send (ev),
        None => debug! ("control loop not up yet, dropped event : {:?}", ev),
    }
}




pub fn setup_global_shortcuts (ah:&AppHandle<Wry>, conf:&Config) {
    // hotkeys are registered regardless of the enabled flag, which the control loop checks on every press
    conf.get_hide_foreground_hotkeys() .iter() .for_each (|hotkey| {
        let res = ah.global_shortcut() .on_shortcut (hotkey.as_str(), |ah, _sc, ev| {
            if ev.state() == ShortcutState::Pressed { send_control_event (ah, ControlEvent::HotkeyFired) }
        });
        if let Err(e) = res {
            warn! ("Failed to register hotkey {:?}: {}", hotkey, e);
        }
    });
}


pub fn setup_front_end_listener (ah:&AppHandle<Wry>, conf:&Config) {
    let ahc = ah.clone();
    let conf = conf.clone();
    let _ = ah.listen ( "frontend_request", move |event| {
        if let Ok(req) = serde_json::from_str::<FrontendRequest> (event.payload()) {
            handle_frontend_request (&ahc, &conf, &req)
        }
    } );
}

fn handle_frontend_request (ah:&AppHandle<Wry>, conf:&Config, req:&FrontendRequest) {
    debug! ("frontend request : {:?}", req);
    let flag_param = || req.params.first() .and_then (|p| p.trim().parse::<bool>().ok());
    match req.req.as_str() {
        "fe_req_set_hotkey_enabled" => {
            let Some(enabled) = flag_param() else { return };
            conf.deferred_update_conf__hotkey_enabled (enabled);
            send_control_event (ah, ControlEvent::SettingsChanged (conf.control_settings()));
        }
        "fe_req_set_auto_refresh" => {
            let Some(enabled) = flag_param() else { return };
            conf.deferred_update_conf__auto_refresh_enabled (enabled);
            send_control_event (ah, ControlEvent::SettingsChanged (conf.control_settings()));
        }
        _ => {
            if let Some(ev) = req.to_control_event() { send_control_event (ah, ev) }
        }
    }
}




fn tauri_window_events_handler (ah:&AppHandle<Wry>, label:&str, ev:&WindowEvent) {
    match ev {
        WindowEvent::CloseRequested { api, .. } if label == MAIN_WINDOW => {
            // closing the main window only puts it away .. quitting is done from the tray menu
            api.prevent_close();
            if let Some(w) = ah.get_webview_window (label) { let _ = w.hide(); }
        }
        WindowEvent::Focused (true) => { send_control_event (ah, ControlEvent::RefreshRequested) }
        _ => { }
    }
}

pub fn tauri_run_events_handler (ah:&AppHandle<Wry>, event:RunEvent) {
    match event {
        RunEvent::WindowEvent { label, event, .. } => { tauri_window_events_handler (ah, &label, &event) }
        RunEvent::ExitRequested { api, .. } => {
            // the loop restores every hidden window on its way out, and its menu updates need this (main) thread ..
            // .. so we hold the exit, wait for the loop elsewhere, and exit again once it is done
            let Some(ctl) = ah.try_state::<ControlHandle>() else { return };
            if ctl.is_stopped() { return }
            api.prevent_exit();
            let (ctl, ah) = (ctl.inner().clone(), ah.clone());
            let _ = std::thread::Builder::new() .name ("traynex-exit".into()) .spawn ( move || {
                ctl.shutdown_and_wait();
                ah.exit(0);
            } );
        }
        RunEvent::Exit => { info! ("Traynex exiting") }
        _ => {}
    }
}
