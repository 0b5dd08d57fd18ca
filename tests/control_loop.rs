//! The control loop, fed events directly or through its channel, with a recording presenter on the other side.

mod common;

use std::sync::mpsc;
use std::time::Duration;

use common::{RecordingPresenter, Rig};

use traynex::app_tray::{entry_id_for, MENU_OPEN_MAIN, MENU_QUIT, MENU_RESTORE_ALL, MENU_RESTORE_LAST};
use traynex::backend::{HideVia, HidingBackend};
use traynex::control::{ControlEvent, ControlHandle, ControlLoop, ControlSettings, FrontendRequest, WindowAction};
use traynex::refresh::RefreshTracker;


fn control (rig:&Rig, settings:ControlSettings) -> (ControlLoop, RecordingPresenter) {
    let presenter = RecordingPresenter::default();
    let ctl = ControlLoop::new (rig.manager(), Box::new (presenter.clone()), settings);
    (ctl, presenter)
}

fn started (rig:&Rig) -> (ControlLoop, RecordingPresenter) {
    let (mut ctl, presenter) = control (rig, ControlSettings::default());
    ctl.startup();
    (ctl, presenter)
}


#[test]
fn startup_applies_the_menu_and_presents_everything() {
    let rig = Rig::with_windows();
    let (_ctl, presenter) = started (&rig);

    assert_eq!( rig.menu.applied(), 1 );
    assert_eq!( presenter.window_pushes(), 1 );
    assert_eq!( presenter.last_windows().len(), 3 );
    assert!( presenter.last_hidden().is_empty() );
}

#[test]
fn startup_recovers_the_previous_session() {
    let rig = Rig::with_windows();
    rig.store.save ([0x200]);
    let (ctl, presenter) = started (&rig);

    assert!( ctl.manager().is_hidden (0x200) );
    assert_eq!( presenter.last_hidden().len(), 1 );
    let listed = presenter.last_windows();
    // hidden windows are no longer visible, so they drop out of the listing
    assert!( listed.iter().all (|w| w.hwnd != 0x200) );
}

#[test]
fn unchanged_ticks_present_nothing_new() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    ctl.handle (ControlEvent::RefreshTick);
    ctl.handle (ControlEvent::RefreshTick);
    assert_eq!( presenter.window_pushes(), 1 );

    rig.world.set_title (0x300, "Calculator - Scientific");
    ctl.handle (ControlEvent::RefreshTick);
    assert_eq!( presenter.window_pushes(), 2 );
    assert_eq!( presenter.last_windows()[2].title, "Calculator - Scientific" );
}

#[test]
fn ticks_are_ignored_when_auto_refresh_is_off() {
    let rig = Rig::with_windows();
    let settings = ControlSettings { auto_refresh_enabled: false, ..ControlSettings::default() };
    let (mut ctl, presenter) = control (&rig, settings);
    ctl.startup();

    rig.world.set_title (0x100, "changed");
    ctl.handle (ControlEvent::RefreshTick);
    assert_eq!( presenter.window_pushes(), 1 );

    // an explicit refresh still goes through
    ctl.handle (ControlEvent::RefreshRequested);
    assert_eq!( presenter.window_pushes(), 2 );
}

#[test]
fn explicit_refresh_always_presents() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    ctl.handle (ControlEvent::RefreshRequested);
    ctl.handle (ControlEvent::RefreshRequested);
    assert_eq!( presenter.window_pushes(), 3 );
}

#[test]
fn open_context_menu_holds_refresh_until_closed() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    ctl.handle (ControlEvent::ContextMenuOpened);
    assert!( ctl.gate().is_paused() );

    rig.world.set_title (0x100, "changed while the menu was up");
    ctl.handle (ControlEvent::RefreshTick);
    ctl.handle (ControlEvent::RefreshTick);
    assert_eq!( presenter.window_pushes(), 1 );

    ctl.handle (ControlEvent::ContextMenuClosed);
    assert!( !ctl.gate().is_paused() );
    assert_eq!( presenter.window_pushes(), 2 );
    assert_eq!( presenter.last_windows()[0].title, "changed while the menu was up" );
}

#[test]
fn hides_done_while_the_menu_is_open_land_once_it_closes() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    ctl.handle (ControlEvent::ContextMenuOpened);
    ctl.handle (ControlEvent::HideRequested { hwnd: 0x100, via: HideVia::native_tray });

    // the hidden list is pushed right away, the window list waits
    assert_eq!( presenter.last_hidden().len(), 1 );
    assert_eq!( presenter.window_pushes(), 1 );

    ctl.handle (ControlEvent::ContextMenuClosed);
    assert_eq!( presenter.window_pushes(), 2 );
    assert_eq!( presenter.last_windows().len(), 2 );
}

#[test]
fn hotkey_hides_the_foreground_window_only_when_enabled() {
    let rig = Rig::with_windows();
    rig.world.set_foreground (0x200);
    let (mut ctl, _presenter) = started (&rig);

    ctl.handle (ControlEvent::SettingsChanged (ControlSettings { hotkey_enabled: false, ..ControlSettings::default() }));
    ctl.handle (ControlEvent::HotkeyFired);
    assert!( !ctl.manager().is_hidden (0x200) );

    ctl.handle (ControlEvent::SettingsChanged (ControlSettings::default()));
    ctl.handle (ControlEvent::HotkeyFired);
    assert_eq!( ctl.manager().holder_of (0x200), Some(HideVia::native_tray) );
}

#[test]
fn icon_and_menu_activations_restore() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    ctl.handle (ControlEvent::HideRequested { hwnd: 0x100, via: HideVia::native_tray });
    ctl.handle (ControlEvent::HideRequested { hwnd: 0x200, via: HideVia::app_tray });
    assert_eq!( presenter.last_hidden().len(), 2 );

    let icon_id = rig.notify.icon_for (0x100).unwrap();
    ctl.handle (ControlEvent::IconActivated (icon_id));
    ctl.handle (ControlEvent::MenuEntryActivated (entry_id_for (0x200)));

    assert!( rig.world.is_visible (0x100) && rig.world.is_visible (0x200) );
    assert!( presenter.last_hidden().is_empty() );
    assert!( presenter.failures().is_empty() );
}

#[test]
fn fixed_menu_actions() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    assert!( ctl.handle (ControlEvent::MenuEntryActivated (MENU_OPEN_MAIN.into())) );
    assert_eq!( presenter.0.lock().unwrap().show_main, 1 );

    for hwnd in [0x100, 0x200, 0x300] {
        ctl.handle (ControlEvent::HideRequested { hwnd, via: HideVia::native_tray });
    }
    ctl.handle (ControlEvent::MenuEntryActivated (MENU_RESTORE_LAST.into()));
    assert!( rig.world.is_visible (0x300) );
    assert_eq!( ctl.manager().recency().to_vec(), vec![0x200, 0x100] );

    ctl.handle (ControlEvent::MenuEntryActivated (MENU_RESTORE_ALL.into()));
    assert_eq!( ctl.manager().hidden_count(), 0 );
}

#[test]
fn quitting_restores_everything_before_asking_to_exit() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);
    ctl.handle (ControlEvent::HideRequested { hwnd: 0x100, via: HideVia::native_tray });
    ctl.handle (ControlEvent::HideRequested { hwnd: 0x200, via: HideVia::app_tray });

    let keep_running = ctl.handle (ControlEvent::MenuEntryActivated (MENU_QUIT.into()));

    assert!( !keep_running );
    assert!( presenter.0.lock().unwrap().exit );
    assert!( rig.world.is_visible (0x100) && rig.world.is_visible (0x200) );
    assert_eq!( rig.notify.count(), 0 );
    assert!( !rig.store.exists() );
}

#[test]
fn failures_are_reported_once_and_change_nothing() {
    let rig = Rig::with_windows();
    rig.world.add_window (0x900, "", "Progman", 4, "explorer.exe");
    let (mut ctl, presenter) = started (&rig);

    ctl.handle (ControlEvent::HideRequested { hwnd: 0x900, via: HideVia::native_tray });
    ctl.handle (ControlEvent::RestoreLastRequested);
    ctl.handle (ControlEvent::RestoreRequested (0x100));

    let failures = presenter.failures();
    assert_eq!( failures.len(), 3 );
    assert_eq!( failures[0].0, "hide" );
    assert_eq!( failures[1].1, "no hidden windows to restore" );
    assert_eq!( ctl.manager().hidden_count(), 0 );
}

#[test]
fn window_actions_reach_the_window() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    ctl.handle (ControlEvent::WindowActionRequested { hwnd: 0x100, action: WindowAction::ToggleTopmost });
    ctl.handle (ControlEvent::WindowActionRequested { hwnd: 0x100, action: WindowAction::Opacity (50) });
    ctl.handle (ControlEvent::WindowActionRequested { hwnd: 0x100, action: WindowAction::Highlight });
    let w = rig.world.window (0x100).unwrap();
    assert!( w.topmost );
    assert_eq!( w.alpha, Some(127) );
    assert_eq!( w.flashes, 1 );

    ctl.handle (ControlEvent::WindowActionRequested { hwnd: 0x300, action: WindowAction::EndTask });
    assert_eq!( rig.world.terminated(), vec![33] );
    // the ended window drops out of the next listing
    assert!( presenter.last_windows().iter().all (|w| w.hwnd != 0x300) );

    ctl.handle (ControlEvent::WindowActionRequested { hwnd: 0x300, action: WindowAction::BringToFront });
    assert_eq!( presenter.failures().len(), 1 );
}

#[test]
fn frontend_requests_drive_the_same_events() {
    let rig = Rig::with_windows();
    let (mut ctl, presenter) = started (&rig);

    let req = |json:&str| serde_json::from_str::<FrontendRequest>(json).unwrap().to_control_event().unwrap();

    ctl.handle (req (r#"{"req":"fe_req_hide_to_menu","hwnd":512,"params":[]}"#));
    assert_eq!( ctl.manager().holder_of (0x200), Some(HideVia::app_tray) );

    ctl.handle (req (r#"{"req":"fe_req_restore","hwnd":512}"#));
    assert!( !ctl.manager().is_hidden (0x200) );
    assert!( presenter.failures().is_empty() );
}

#[test]
fn shutdown_restores_and_stops() {
    let rig = Rig::with_windows();
    let (mut ctl, _presenter) = started (&rig);
    ctl.handle (ControlEvent::HideRequested { hwnd: 0x100, via: HideVia::native_tray });

    assert!( !ctl.handle (ControlEvent::Shutdown) );
    assert!( rig.world.is_visible (0x100) );
    assert!( ctl.manager().native().is_empty() );
}

#[test]
fn spawned_loop_serves_events_and_restores_on_shutdown() {
    let rig = Rig::with_windows();
    let settings = ControlSettings { refresh_interval: Duration::from_millis(100), ..ControlSettings::default() };
    let (ctl, presenter) = control (&rig, settings);
    let (tx, rx) = mpsc::channel();
    let handle = ControlHandle::spawn (ctl, tx, rx);

    handle.send (ControlEvent::HideRequested { hwnd: 0x100, via: HideVia::native_tray });
    handle.send (ControlEvent::HideRequested { hwnd: 0x200, via: HideVia::app_tray });
    handle.shutdown_and_wait();

    assert!( handle.is_stopped() );
    assert!( rig.world.is_visible (0x100) && rig.world.is_visible (0x200) );
    assert_eq!( rig.notify.count(), 0 );
    assert!( presenter.window_pushes() >= 1 );
}

#[test]
fn tracker_presents_only_real_changes() {
    let rig = Rig::with_windows();
    let mgr = rig.manager();
    let mut tracker = RefreshTracker::new();

    assert!( tracker.update (mgr.snapshot()).is_some() );
    assert!( tracker.update (mgr.snapshot()).is_none() );

    rig.world.edit (0x200, |fw| fw.raw.pid = 99);
    let changed = tracker.update (mgr.snapshot()) .map (|l| l.to_vec());
    assert_eq!( changed.unwrap()[1].pid, 99 );
}
