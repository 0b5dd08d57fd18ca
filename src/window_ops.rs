use tracing::info;

use crate::errors::{TrayError, TrayResult};
use crate::platform::{Hwnd, WindowSystem};


// Per-window actions offered from the window list. Each one re-checks the handle first, as the list may be stale.


pub const MIN_OPACITY_PERCENT : u8 = 10;


fn live (ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<Hwnd> {
    if hwnd == 0 { return Err (TrayError::InvalidHandle) }
    if !ws.is_live(hwnd) { return Err (TrayError::WindowGone (hwnd)) }
    Ok (hwnd)
}


pub fn bring_to_front (ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()> {
    ws.bring_to_front (live(ws, hwnd)?);
    Ok(())
}

/// Flips the always-on-top state, returning the new state
pub fn toggle_topmost (ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<bool> {
    let hwnd = live (ws, hwnd)?;
    let on_top = !ws.is_topmost (hwnd);
    if !ws.set_topmost (hwnd, on_top) {
        return Err (TrayError::WindowGone (hwnd))
    }
    info! ("set {:#x} always-on-top : {}", hwnd, on_top);
    Ok (on_top)
}

/// Maps an opacity percentage (clamped to 10..=100) onto a layered-window alpha
pub fn opacity_to_alpha (percent:u8) -> u8 {
    let percent = percent.clamp (MIN_OPACITY_PERCENT, 100) as u32;
    (percent * 256 / 100) .saturating_sub(1) .min(255) as u8
}

pub fn set_opacity (ws:&dyn WindowSystem, hwnd:Hwnd, percent:u8) -> TrayResult<u8> {
    let hwnd = live (ws, hwnd)?;
    let alpha = opacity_to_alpha (percent);
    if !ws.set_opacity_alpha (hwnd, alpha) {
        return Err (TrayError::WindowGone (hwnd))
    }
    Ok (alpha)
}

pub fn highlight (ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()> {
    ws.flash (live(ws, hwnd)?);
    Ok(())
}

/// Terminates the process owning the window. Refuses to take down our own process.
pub fn end_task (ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<u32> {
    let hwnd = live (ws, hwnd)?;
    let pid = ws.window_pid (hwnd);
    if pid == 0 { return Err (TrayError::WindowGone (hwnd)) }
    if pid == ws.current_pid() {
        return Err (TrayError::Protected (ws.class_name(hwnd).unwrap_or_default()))
    }
    if !ws.terminate_process (pid) {
        return Err (TrayError::WindowGone (hwnd))
    }
    info! ("ended task pid {} (window {:#x})", pid, hwnd);
    Ok (pid)
}
