#![ allow (non_snake_case) ]

use std::ffi::c_void;
use std::mem::size_of;
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW
};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, PostMessageW, PostQuitMessage,
    RegisterClassW, TranslateMessage, HWND_MESSAGE, MSG, WINDOW_EX_STYLE, WINDOW_STYLE, WM_APP, WM_CLOSE,
    WM_DESTROY, WM_LBUTTONDBLCLK, WNDCLASSW
};

use crate::control::ControlEvent;
use crate::errors::TrayError;
use crate::platform::{utf16_truncated, Hwnd, IconSource, NotifyArea, RawWindow, WindowSystem};
use crate::win_apis;



/// The live desktop
# [ derive (Debug, Default, Clone, Copy) ]
pub struct WinOs;

impl WindowSystem for WinOs {

    fn enum_top_level (&self) -> Vec<RawWindow> {
        win_apis::enum_top_level_windows() .into_iter() .map (|hwnd| RawWindow {
            hwnd,
            is_live        : win_apis::check_window_exists (hwnd),
            is_visible     : win_apis::check_window_visible (hwnd),
            pid            : win_apis::get_window_pid (hwnd),
            is_tool_window : win_apis::check_if_tool_window (hwnd),
            is_app_window  : win_apis::check_if_app_window (hwnd),
            is_no_activate : win_apis::check_if_no_activate (hwnd),
            has_owner      : win_apis::check_window_has_owner (hwnd),
            deleted_marker : win_apis::check_deleted_from_taskbar (hwnd),
            class_name     : win_apis::get_window_class_name (hwnd) .unwrap_or_default(),
        } ) .collect()
    }

    fn is_live    (&self, hwnd:Hwnd) -> bool { win_apis::check_window_exists (hwnd) }
    fn class_name (&self, hwnd:Hwnd) -> Option<String> { win_apis::get_window_class_name (hwnd) }
    fn window_text (&self, hwnd:Hwnd) -> String { win_apis::get_window_text (hwnd) }
    fn window_pid (&self, hwnd:Hwnd) -> u32 { win_apis::get_window_pid (hwnd) }

    fn process_image_name (&self, pid:u32) -> Option<String> {
        win_apis::get_pid_exe_path (pid) .and_then (|p| win_apis::exe_base_name (&p))
    }

    fn icon_source (&self, hwnd:Hwnd, pid:u32) -> Option<IconSource> {
        win_apis::get_window_msg_icon (hwnd) .map (IconSource::Window)
            .or_else (|| win_apis::get_window_class_icon (hwnd) .map (IconSource::Class))
            .or_else (|| win_apis::get_exe_icon_source (pid) .map (IconSource::Executable))
    }

    fn current_pid (&self) -> u32 { win_apis::get_cur_pid() }

    fn foreground_window (&self) -> Option<Hwnd> {
        Some (win_apis::get_fgnd_window()) .filter (|&h| h != 0)
    }

    fn hide_window (&self, hwnd:Hwnd) { win_apis::window_hide (hwnd) }
    fn show_and_foreground (&self, hwnd:Hwnd) -> bool { win_apis::window_show_and_activate (hwnd) }

    fn bring_to_front (&self, hwnd:Hwnd) { win_apis::window_bring_to_front (hwnd) }
    fn is_topmost (&self, hwnd:Hwnd) -> bool { win_apis::check_if_topmost (hwnd) }
    fn set_topmost (&self, hwnd:Hwnd, on_top:bool) -> bool { win_apis::window_set_topmost (hwnd, on_top) }
    fn set_opacity_alpha (&self, hwnd:Hwnd, alpha:u8) -> bool { win_apis::window_set_alpha (hwnd, alpha) }
    fn flash (&self, hwnd:Hwnd) { win_apis::window_flash (hwnd) }
    fn terminate_process (&self, pid:u32) -> bool { win_apis::process_terminate (pid) }
}




/// Callback message the shell posts to our host window for icon mouse events
pub const TRAY_CALLBACK_MSG : u32 = WM_APP + 1;

const HOST_CLASS_NAME : PCWSTR = w!("TraynexTrayIconHost");

// the wndproc has no context pointer of its own, so it reaches the control loop through this
static ICON_EVENTS_TX : OnceCell <Mutex <Sender <ControlEvent>>> = OnceCell::new();


/// Owner of every notification-area icon we register. Icons are added and removed from the control thread, while the
/// shell's callbacks land on the host window's own thread and are forwarded as [`ControlEvent::IconActivated`].
pub struct NotifyIconHost {
    host_hwnd : Hwnd,
}

impl NotifyIconHost {

    /// Spawns the host window thread and waits for its window to exist
    pub fn start (tx:Sender<ControlEvent>) -> Result<NotifyIconHost, TrayError> {
        if ICON_EVENTS_TX.set (Mutex::new(tx)).is_err() {
            warn! ("notify icon host was already started once .. keeping the earlier event sender");
        }
        let (hwnd_tx, hwnd_rx) = mpsc::channel::<Option<Hwnd>>();
        thread::Builder::new() .name ("traynex-tray-host".into()) .spawn ( move || {
            let hwnd = create_host_window();
            let _ = hwnd_tx.send (hwnd);
            if hwnd.is_some() { run_message_loop() }
        } ) .map_err (|e| TrayError::IconRegistration (format!("host thread: {}", e)))?;

        match hwnd_rx.recv() {
            Ok (Some(host_hwnd)) => {
                info! ("notify icon host window ready : {:#x}", host_hwnd);
                Ok ( NotifyIconHost { host_hwnd } )
            }
            _ => Err ( TrayError::IconRegistration ("could not create the icon host window".into()) ),
        }
    }

    fn icon_data (&self, icon_id:u32) -> NOTIFYICONDATAW {
        NOTIFYICONDATAW {
            cbSize : size_of::<NOTIFYICONDATAW>() as u32,
            hWnd   : HWND (self.host_hwnd as *mut c_void),
            uID    : icon_id,
            ..Default::default()
        }
    }
}

impl NotifyArea for NotifyIconHost {

    fn add_icon (&mut self, icon_id:u32, target:Hwnd, tooltip:&str) -> Result<(), TrayError> {
        let mut nid = self.icon_data (icon_id);
        nid.uFlags           = NIF_MESSAGE | NIF_ICON | NIF_TIP;
        nid.uCallbackMessage = TRAY_CALLBACK_MSG;
        nid.hIcon            = win_apis::resolve_tray_icon (target);
        // the tip buffer is fixed size, and must stay nul terminated
        let max_tip = nid.szTip.len() - 1;
        utf16_truncated (tooltip, max_tip) .into_iter() .enumerate() .for_each (|(i,c)| nid.szTip[i] = c);

        let ok = unsafe { Shell_NotifyIconW (NIM_ADD, &nid) } .as_bool();
        if ok { Ok(()) } else {
            Err ( TrayError::IconRegistration (format!("shell refused icon {} for {:#x}", icon_id, target)) )
        }
    }

    fn remove_icon (&mut self, icon_id:u32) {
        let nid = self.icon_data (icon_id);
        if !unsafe { Shell_NotifyIconW (NIM_DELETE, &nid) } .as_bool() {
            debug! ("icon {} was already gone from the notification area", icon_id);
        }
    }
}

impl Drop for NotifyIconHost {
    fn drop (&mut self) {
        let _ = unsafe { PostMessageW (HWND (self.host_hwnd as *mut c_void), WM_CLOSE, WPARAM(0), LPARAM(0)) };
    }
}



fn create_host_window () -> Option<Hwnd> { unsafe {
    let hinstance = GetModuleHandleW (None) .ok()?;
    let wc = WNDCLASSW {
        lpfnWndProc   : Some (host_wnd_proc),
        hInstance     : hinstance.into(),
        lpszClassName : HOST_CLASS_NAME,
        ..Default::default()
    };
    if RegisterClassW (&wc) == 0 { warn! ("icon host window class registration failed") }

    CreateWindowExW (
        WINDOW_EX_STYLE::default(), HOST_CLASS_NAME, w!("Traynex tray icons"), WINDOW_STYLE::default(),
        0, 0, 0, 0, HWND_MESSAGE, None, hinstance, None
    ) .map_err (|e| warn! ("icon host window creation failed : {:?}", e)) .ok() .map (|h| h.0 as Hwnd)
} }

fn run_message_loop () { unsafe {
    let mut msg = MSG::default();
    while GetMessageW (&mut msg, HWND::default(), 0, 0) .as_bool() {
        let _ = TranslateMessage (&msg);
        DispatchMessageW (&msg);
    }
    debug! ("icon host message loop exited");
} }

unsafe extern "system" fn host_wnd_proc (hwnd:HWND, msg:u32, wp:WPARAM, lp:LPARAM) -> LRESULT {
    match msg {
        TRAY_CALLBACK_MSG => {
            // wparam carries the icon id, lparam the mouse message
            if lp.0 as u32 == WM_LBUTTONDBLCLK {
                forward_icon_activation (wp.0 as u32);
            }
            LRESULT(0)
        }
        WM_CLOSE   => { let _ = DestroyWindow (hwnd); LRESULT(0) }
        WM_DESTROY => { PostQuitMessage (0); LRESULT(0) }
        _ => DefWindowProcW (hwnd, msg, wp, lp),
    }
}

fn forward_icon_activation (icon_id:u32) {
    let Some(tx) = ICON_EVENTS_TX.get() else { return };
    if tx.lock().unwrap() .send (ControlEvent::IconActivated (icon_id)) .is_err() {
        debug! ("icon {} activated after the control loop went away", icon_id);
    }
}
