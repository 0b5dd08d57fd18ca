use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::platform::{Hwnd, IconSource, RawWindow, WindowSystem};



# [ derive (Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize) ]
/// One user-facing top-level window, as of a single enumeration pass. Rebuilt from scratch on every refresh.
pub struct WindowSnapshot {
    pub hwnd         : Hwnd,
    pub title        : String,
    pub pid          : u32,
    pub process_name : String,
    pub class_name   : String,
    #[serde(skip)]
    pub icon         : Option<IconSource>,
    pub is_visible   : bool,
    pub is_hidden    : bool,
}

impl WindowSnapshot {
    pub const UNKNOWN_PROCESS_STR : &'static str = "Unknown";

    /// the fields whose change should trigger a redraw of the presentation list
    fn observable (&self) -> (Hwnd, bool, &str, &str, &str, u32) {
        (self.hwnd, self.is_hidden, &self.title, &self.process_name, &self.class_name, self.pid)
    }
    pub fn same_observable_state (&self, other:&WindowSnapshot) -> bool {
        self.observable() == other.observable()
    }
}



/// Shell and system frames that show up as normal-looking top-level windows but are never worth listing
pub const SHELL_CLASS_DENYLIST : [&str; 4] = [
    "ApplicationFrameWindow",
    "Windows.UI.Core.CoreWindow",
    "StartMenuSizingFrame",
    "Shell_LightDismissOverlay",
];


/// Checks a raw enumerated window against the listing filters, in order. Failing any of them drops the window entirely.
pub fn passes_listing_filters (rw:&RawWindow, self_pid:u32) -> bool {
    if !rw.is_live || !rw.is_visible  { return false }
    if  rw.pid == self_pid            { return false }
    if  rw.is_tool_window             { return false }
    if  rw.deleted_marker             { return false }

    if !rw.is_app_window {
        if  rw.has_owner       { return false }
        if  rw.is_no_activate  { return false }
    }
    !SHELL_CLASS_DENYLIST .contains (&rw.class_name.as_str())
}


/// Walks the OS top-level window list once and produces the user-facing windows in enumeration order.
/// `hidden` is the union of both hidden registries, used only to mark the `is_hidden` flag.
pub fn snapshot (ws:&dyn WindowSystem, hidden:&HashSet<Hwnd>) -> Vec<WindowSnapshot> {
    let self_pid = ws.current_pid();
    ws.enum_top_level() .into_iter()
        .filter (|rw| passes_listing_filters (rw, self_pid))
        .map (|rw| {
            let process_name = ws.process_image_name (rw.pid)
                .filter (|n| !n.is_empty())
                .unwrap_or_else (|| WindowSnapshot::UNKNOWN_PROCESS_STR.to_string());
            WindowSnapshot {
                hwnd         : rw.hwnd,
                title        : ws.window_text (rw.hwnd),
                pid          : rw.pid,
                process_name,
                icon         : ws.icon_source (rw.hwnd, rw.pid),
                class_name   : rw.class_name,
                is_visible   : rw.is_visible,
                is_hidden    : hidden.contains (&rw.hwnd),
            }
        } )
        .collect()
}
