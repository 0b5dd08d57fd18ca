use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app_tray::MenuSlot;
use crate::errors::TrayError;


/// Raw top-level window handle value. Identity only .. whether it still refers to a live window is a separate query.
pub type Hwnd = isize;



# [ derive (Debug, Default, Eq, PartialEq, Hash, Clone, Serialize, Deserialize) ]
/// The raw attributes of one top-level window, as seen during a single enumeration walk
pub struct RawWindow {
    pub hwnd           : Hwnd,
    pub is_live        : bool,
    pub is_visible     : bool,
    pub pid            : u32,
    pub is_tool_window : bool,
    pub is_app_window  : bool,
    pub is_no_activate : bool,
    pub has_owner      : bool,
    pub deleted_marker : bool,
    pub class_name     : String,
}


# [ derive (Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize) ]
/// Where a display icon for a window can be had from. We only note the source during enumeration ..
/// .. actual icon handles are never held past the call that found them.
pub enum IconSource {
    /// icon handle the window itself answered with (owned by the window, must never be destroyed)
    Window (isize),
    Class (isize),
    Executable (PathBuf),
}



// every hwnd here may be stale .. queries on a dead handle return the empty/false/None answer instead of failing
pub trait WindowSystem : Send + Sync {

    fn enum_top_level (&self) -> Vec<RawWindow>;

    fn is_live (&self, hwnd:Hwnd) -> bool;
    fn class_name (&self, hwnd:Hwnd) -> Option<String>;
    fn window_text (&self, hwnd:Hwnd) -> String;
    fn window_pid (&self, hwnd:Hwnd) -> u32;

    /// Base name of the process image, e.g. `notepad.exe`
    fn process_image_name (&self, pid:u32) -> Option<String>;
    fn icon_source (&self, hwnd:Hwnd, pid:u32) -> Option<IconSource>;

    fn current_pid (&self) -> u32;
    fn foreground_window (&self) -> Option<Hwnd>;

    fn hide_window (&self, hwnd:Hwnd);
    /// false if the window would not even take the request (e.g. its thread is hung)
    fn show_and_foreground (&self, hwnd:Hwnd) -> bool;

    // auxiliary per-window operations
    fn bring_to_front (&self, hwnd:Hwnd);
    fn is_topmost (&self, hwnd:Hwnd) -> bool;
    fn set_topmost (&self, hwnd:Hwnd, on_top:bool) -> bool;
    fn set_opacity_alpha (&self, hwnd:Hwnd, alpha:u8) -> bool;
    fn flash (&self, hwnd:Hwnd);
    fn terminate_process (&self, pid:u32) -> bool;
}


pub trait NotifyArea : Send {
    /// Registers an icon tagged with `icon_id` .. the icon image is resolved from `target`, `tooltip` shown on hover
    fn add_icon (&mut self, icon_id:u32, target:Hwnd, tooltip:&str) -> Result<(), TrayError>;
    fn remove_icon (&mut self, icon_id:u32);
}


/// The application-owned tray menu .. it is always re-applied as a whole layout
pub trait MenuSink : Send {
    fn apply_layout (&mut self, layout:&[MenuSlot]) -> Result<(), TrayError>;
}



/// Encodes text for a fixed-size wide-char buffer, keeping at most `max_units` and never splitting a surrogate pair
pub fn utf16_truncated (text:&str, max_units:usize) -> Vec<u16> {
    let mut units = text .encode_utf16() .take (max_units) .collect::<Vec<_>>();
    if units.len() == max_units && units.last() .is_some_and (|&u| (0xD800..0xDC00).contains(&u)) {
        units.pop();
    }
    units
}
