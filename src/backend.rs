use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

use crate::errors::{TrayError, TrayResult};
use crate::platform::{Hwnd, WindowSystem};



#[allow(non_camel_case_types)]
#[derive (Debug, Eq, PartialEq, Hash, Copy, Clone, AsRefStr, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Which of the two hiding mechanisms holds (or should hold) a window
pub enum HideVia {
    native_tray,
    app_tray,
}
impl HideVia {
    pub fn str (&self) -> &str { self.as_ref() }
}


# [ derive (Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize) ]
pub struct HiddenWindowInfo {
    pub hwnd         : Hwnd,
    pub title        : String,
    pub process_name : String,
    pub via          : HideVia,
}



/// Window classes that must never be hidden: desktop worker windows, the taskbar host, the shell's program manager,
/// and our own main window
pub const PROTECTED_CLASSES : [&str; 4] = [
    "WorkerW",
    "Shell_TrayWnd",
    "Progman",
    "Traynex",
];

pub fn is_protected_class (class_name:&str) -> bool {
    PROTECTED_CLASSES .contains (&class_name)
}


/// The checks shared by both mechanisms before anything is touched. Returns the window class on success.
pub fn check_hideable (ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<String> {
    if hwnd == 0 { return Err (TrayError::InvalidHandle) }
    if !ws.is_live (hwnd) { return Err (TrayError::WindowGone (hwnd)) }
    let class_name = ws.class_name (hwnd) .ok_or (TrayError::InvalidHandle)?;
    if is_protected_class (&class_name) { return Err (TrayError::Protected (class_name)) }
    Ok (class_name)
}



/// One of the two interchangeable ways of hiding a window. A failing `hide` or `restore` leaves the entry table as it was,
/// except that a `restore` finding its window already gone drops the entry and returns [`TrayError::WindowGone`].
pub trait HidingBackend : Send {

    fn via (&self) -> HideVia;

    fn hide (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()>;

    fn restore (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()>;

    /// Shows every live entry (dead ones are skipped silently), then empties the table. Returns how many were shown.
    fn restore_all (&mut self, ws:&dyn WindowSystem) -> usize;

    fn contains (&self, hwnd:Hwnd) -> bool;

    /// Drops the entry for a handle known to be dead, without touching the window. Returns whether there was one.
    fn drop_stale (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> bool;

    fn hidden_hwnds (&self) -> Vec<Hwnd>;

    fn listing (&self, ws:&dyn WindowSystem) -> Vec<HiddenWindowInfo>;

    fn len (&self) -> usize { self.hidden_hwnds().len() }
    fn is_empty (&self) -> bool { self.len() == 0 }
}
