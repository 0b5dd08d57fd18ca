#![ allow (non_upper_case_globals, non_snake_case) ]

use std::ffi::c_void;
use std::mem::size_of;
use std::path::PathBuf;

use windows::core::{w, PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    BOOL, CloseHandle, COLORREF, ERROR_ALREADY_EXISTS, GetLastError, HANDLE, HINSTANCE, HWND, LPARAM, WPARAM
};
use windows::Win32::System::Threading::{
    CreateMutexW, GetCurrentProcessId, OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_TERMINATE, QueryFullProcessImageNameW, ReleaseMutex, TerminateProcess
};
use windows::Win32::UI::Shell::ExtractIconW;
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, FlashWindow, GetAncestor, GetClassLongPtrW, GetClassNameW, GetForegroundWindow, GetPropW,
    GetWindowLongW, GetWindowPlacement, GetWindowTextW, GetWindowThreadProcessId, IsWindow, IsWindowVisible, LoadIconW,
    SendMessageTimeoutW, SetForegroundWindow, SetLayeredWindowAttributes, SetWindowLongW, SetWindowPos, ShowWindowAsync,
    BringWindowToTop, GA_ROOTOWNER, GCLP_HICONSM, GWL_EXSTYLE, HICON, HWND_NOTOPMOST, HWND_TOPMOST, ICON_SMALL,
    IDI_APPLICATION, LWA_ALPHA, SMTO_ABORTIFHUNG, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SW_HIDE, SW_RESTORE,
    SW_SHOW, SW_SHOWMINIMIZED, WINDOWPLACEMENT, WM_GETICON, WS_EX_APPWINDOW, WS_EX_LAYERED, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST
};

use crate::platform::Hwnd;



fn hwnd (h:Hwnd) -> HWND { HWND (h as *mut c_void) }



pub fn check_window_exists (h:Hwnd) -> bool { unsafe {
    h != 0 && IsWindow (hwnd(h)) .as_bool()
} }

pub fn check_window_visible (h:Hwnd) -> bool { unsafe {
    IsWindowVisible (hwnd(h)) .as_bool()
} }

fn get_ex_style (h:Hwnd) -> u32 { unsafe {
    GetWindowLongW (hwnd(h), GWL_EXSTYLE) as u32
} }

pub fn check_if_app_window (h:Hwnd) -> bool {
    get_ex_style(h) & WS_EX_APPWINDOW.0 != 0
}
pub fn check_if_tool_window (h:Hwnd) -> bool {
    get_ex_style(h) & WS_EX_TOOLWINDOW.0 != 0
}
pub fn check_if_no_activate (h:Hwnd) -> bool {
    get_ex_style(h) & WS_EX_NOACTIVATE.0 != 0
}
pub fn check_if_topmost (h:Hwnd) -> bool {
    get_ex_style(h) & WS_EX_TOPMOST.0 != 0
}

pub fn check_window_has_owner (h:Hwnd) -> bool { unsafe {
    GetAncestor (hwnd(h), GA_ROOTOWNER).0 as Hwnd != h
} }

/// The shell tags windows it has been told to keep off the taskbar with this property
pub fn check_deleted_from_taskbar (h:Hwnd) -> bool { unsafe {
    !GetPropW (hwnd(h), w!("ITaskList_Deleted")) .is_invalid()
} }

pub fn get_fgnd_window () -> Hwnd { unsafe {
    GetForegroundWindow().0 as Hwnd
} }

pub fn get_cur_pid () -> u32 { unsafe { GetCurrentProcessId() } }



pub fn get_window_text (h:Hwnd) -> String { unsafe {
    const MAX_LEN : usize = 512;
    let mut lpstr = [0u16; MAX_LEN];
    let copied_len = GetWindowTextW (hwnd(h), &mut lpstr);
    String::from_utf16_lossy (&lpstr[..(copied_len.max(0) as usize)])
} }

pub fn get_window_class_name (h:Hwnd) -> Option<String> { unsafe {
    let mut buf = [0u16; 256];
    let len = GetClassNameW (hwnd(h), &mut buf);
    if len <= 0 { return None }
    Some (String::from_utf16_lossy (&buf[..len as usize]))
} }

pub fn get_window_pid (h:Hwnd) -> u32 { unsafe {
    let mut pid : u32 = 0;
    let _ = GetWindowThreadProcessId (hwnd(h), Some(&mut pid));
    pid
} }

/// Full image path of a process .. the query handle is closed before returning
pub fn get_pid_exe_path (pid:u32) -> Option<String> { unsafe {
    const MAX_LEN : usize = 1024;
    let handle = OpenProcess (PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), pid) .ok()?;
    let mut buf = [0u16; MAX_LEN];
    let mut len = MAX_LEN as u32;
    let res = QueryFullProcessImageNameW (handle, PROCESS_NAME_WIN32, PWSTR::from_raw(buf.as_mut_ptr()), &mut len);
    let _ = CloseHandle (handle);
    res.ok()?;
    Some (String::from_utf16_lossy (&buf[..len as usize]))
} }

pub fn exe_base_name (exe_path:&str) -> Option<String> {
    exe_path .rsplit (['\\', '/']) .next() .filter (|s| !s.is_empty()) .map (|s| s.to_string())
}



pub fn window_hide (h:Hwnd) { unsafe {
    // the async variant, as a sync hide from our thread may fail to pull kbd focus off the window being hidden
    let _ = ShowWindowAsync (hwnd(h), SW_HIDE);
} }

/// returns false if the show request could not even be posted to the window's thread
pub fn window_show_and_activate (h:Hwnd) -> bool { unsafe {
    let mut placement = WINDOWPLACEMENT { length: size_of::<WINDOWPLACEMENT>() as u32, ..Default::default() };
    let _ = GetWindowPlacement (hwnd(h), &mut placement);
    let cmd = if placement.showCmd == SW_SHOWMINIMIZED.0 as u32 { SW_RESTORE } else { SW_SHOW };
    if !ShowWindowAsync (hwnd(h), cmd) .as_bool() { return false }
    let _ = SetForegroundWindow (hwnd(h));
    true
} }

pub fn window_bring_to_front (h:Hwnd) { unsafe {
    let _ = ShowWindowAsync (hwnd(h), SW_RESTORE);
    let _ = BringWindowToTop (hwnd(h));
    let _ = SetForegroundWindow (hwnd(h));
} }

pub fn window_set_topmost (h:Hwnd, on_top:bool) -> bool { unsafe {
    let insert_after = if on_top { HWND_TOPMOST } else { HWND_NOTOPMOST };
    SetWindowPos (hwnd(h), insert_after, 0, 0, 0, 0, SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE) .is_ok()
} }

pub fn window_set_alpha (h:Hwnd, alpha:u8) -> bool { unsafe {
    let ex_style = get_ex_style(h);
    if ex_style & WS_EX_LAYERED.0 == 0 {
        SetWindowLongW (hwnd(h), GWL_EXSTYLE, (ex_style | WS_EX_LAYERED.0) as i32);
    }
    SetLayeredWindowAttributes (hwnd(h), COLORREF(0), alpha, LWA_ALPHA) .is_ok()
} }

pub fn window_flash (h:Hwnd) { unsafe {
    let _ = FlashWindow (hwnd(h), BOOL::from(true));
} }

pub fn process_terminate (pid:u32) -> bool { unsafe {
    let Ok(handle) = OpenProcess (PROCESS_TERMINATE, BOOL::from(false), pid) else { return false };
    let res = TerminateProcess (handle, 0);
    let _ = CloseHandle (handle);
    res.is_ok()
} }



/// Small icon the window itself answers with .. bounded wait, so a hung window can't stall us
pub fn get_window_msg_icon (h:Hwnd) -> Option<isize> { unsafe {
    let mut res : usize = 0;
    let ok = SendMessageTimeoutW (
        hwnd(h), WM_GETICON, WPARAM(ICON_SMALL as usize), LPARAM(0), SMTO_ABORTIFHUNG, 100, Some(&mut res)
    );
    if ok.0 == 0 || res == 0 { None } else { Some (res as isize) }
} }

pub fn get_window_class_icon (h:Hwnd) -> Option<isize> { unsafe {
    let res = GetClassLongPtrW (hwnd(h), GCLP_HICONSM);
    if res == 0 { None } else { Some (res as isize) }
} }

/// Whether the executable carries any icon at all. With index u32::MAX the call only counts, it creates no handles.
pub fn check_exe_has_icon (exe_path:&str) -> bool { unsafe {
    let path_w : Vec<u16> = exe_path.encode_utf16().chain(std::iter::once(0)).collect();
    let count = ExtractIconW (HINSTANCE::default(), PCWSTR(path_w.as_ptr()), u32::MAX);
    count.0 as usize > 0
} }

pub fn get_exe_icon_source (pid:u32) -> Option<PathBuf> {
    get_pid_exe_path (pid) .filter (|p| check_exe_has_icon(p)) .map (PathBuf::from)
}

/// The icon to show in the notification area for a window: its own small icon, its class icon, else the stock one.
/// None of these are ours to destroy.
pub fn resolve_tray_icon (h:Hwnd) -> HICON {
    get_window_msg_icon (h)
        .or_else (|| get_window_class_icon (h))
        .map (|i| HICON (i as *mut c_void))
        .or_else (|| unsafe { LoadIconW (HINSTANCE::default(), IDI_APPLICATION) .ok() })
        .unwrap_or_default()
}



/// Walks all top-level windows once, in OS z-order
pub fn enum_top_level_windows () -> Vec<Hwnd> { unsafe {
    let mut hwnds : Vec<Hwnd> = Vec::new();
    let _ = EnumWindows ( Some(enum_windows_cb), LPARAM (&mut hwnds as *mut Vec<Hwnd> as isize) );
    hwnds
} }

#[ allow (clippy::missing_safety_doc) ]
pub unsafe extern "system" fn enum_windows_cb (h:HWND, lp:LPARAM) -> BOOL {
    let hwnds = &mut *(lp.0 as *mut Vec<Hwnd>);
    hwnds.push (h.0 as Hwnd);
    BOOL (true as i32)
}




/// Named mutex held for as long as this process runs .. dropping it lets the next instance start
pub struct InstanceMutex (HANDLE);

impl Drop for InstanceMutex {
    fn drop (&mut self) { unsafe {
        let _ = ReleaseMutex (self.0);
        let _ = CloseHandle (self.0);
    } }
}

/// Claims the named mutex, or returns None if some other holder (usually an earlier instance) already has it
pub fn claim_instance_mutex (name:PCWSTR) -> Option<InstanceMutex> { unsafe {
    let h = CreateMutexW (None, true, name) .ok()?;
    if GetLastError() == ERROR_ALREADY_EXISTS {
        let _ = CloseHandle (h);
        return None
    }
    Some (InstanceMutex (h))
} }
