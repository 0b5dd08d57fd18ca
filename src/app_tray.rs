use tracing::{info, warn};

use crate::backend::{check_hideable, HiddenWindowInfo, HideVia, HidingBackend};
use crate::enumeration::WindowSnapshot;
use crate::errors::{TrayError, TrayResult};
use crate::platform::{Hwnd, MenuSink, WindowSystem};



pub const MENU_OPEN_MAIN    : &str = "open_main";
pub const MENU_RESTORE_LAST : &str = "restore_last";
pub const MENU_RESTORE_ALL  : &str = "restore_all";
pub const MENU_QUIT         : &str = "quit";
// note: ^^ plain consts rather than an enum, as menu events hand us back bare id strings to match against

pub const HIDDEN_ENTRY_PREFIX : &str = "hidden_win:";

pub const MAX_LABEL_CHARS   : usize = 40;
pub const UNKNOWN_WINDOW_STR : &str = "Unknown Window";


# [ derive (Debug, Eq, PartialEq, Hash, Clone) ]
/// One position in the application tray menu
pub enum MenuSlot {
    Item { id: String, label: String },
    Separator,
}

impl MenuSlot {
    fn item (id:&str, label:&str) -> MenuSlot {
        MenuSlot::Item { id: id.to_string(), label: label.to_string() }
    }
    pub fn id (&self) -> Option<&str> {
        match self { MenuSlot::Item {id, ..} => Some(id), MenuSlot::Separator => None }
    }
}


pub fn fixed_action_label (id:&str) -> &'static str {
    match id {
        MENU_OPEN_MAIN    => "Open Traynex",
        MENU_RESTORE_LAST => "Restore Last Window",
        MENU_RESTORE_ALL  => "Restore All Windows",
        MENU_QUIT         => "Quit",
        _ => ""
    }
}

pub fn entry_id_for (hwnd:Hwnd) -> String {
    format! ("{}{}", HIDDEN_ENTRY_PREFIX, hwnd)
}

/// Parses a dynamic entry id back to its window handle .. None for the fixed actions or anything malformed
pub fn parse_entry_id (id:&str) -> Option<Hwnd> {
    id .strip_prefix (HIDDEN_ENTRY_PREFIX) .and_then (|h| h.parse::<Hwnd>().ok()) .filter (|&h| h != 0)
}

/// Menu label for a hidden window: overlong titles are cut to fit with an ellipsis, empty ones get a placeholder
pub fn truncate_label (title:&str) -> String {
    let title = title.trim();
    if title.is_empty() { return UNKNOWN_WINDOW_STR.to_string() }
    if title.chars().count() > MAX_LABEL_CHARS {
        let mut s = title .chars() .take (MAX_LABEL_CHARS - 3) .collect::<String>();
        s.push_str ("...");
        return s
    }
    title.to_string()
}



# [ derive (Debug, Eq, PartialEq, Hash, Clone) ]
pub struct AppTrayEntry {
    pub hwnd         : Hwnd,
    pub entry_id     : String,
    pub title        : String,
    pub process_name : String,
}

impl AppTrayEntry {
    pub fn label (&self) -> String { truncate_label (&self.title) }
}


/// Builds the full menu layout around the given dynamic block of entries.
/// The fixed actions always sit at the same anchors, the hidden windows always between the first two separators.
pub fn menu_layout (entries:&[AppTrayEntry]) -> Vec<MenuSlot> {
    let mut layout = vec! [
        MenuSlot::item (MENU_OPEN_MAIN, fixed_action_label(MENU_OPEN_MAIN)),
        MenuSlot::Separator,
    ];
    layout .extend ( entries .iter() .map (|e| MenuSlot::Item { id: e.entry_id.clone(), label: e.label() }) );
    layout .extend ( [
        MenuSlot::Separator,
        MenuSlot::item (MENU_RESTORE_LAST, fixed_action_label(MENU_RESTORE_LAST)),
        MenuSlot::item (MENU_RESTORE_ALL,  fixed_action_label(MENU_RESTORE_ALL)),
        MenuSlot::Separator,
        MenuSlot::item (MENU_QUIT, fixed_action_label(MENU_QUIT)),
    ] );
    layout
}




/// Windows hidden into our own tray menu rather than getting an icon of their own
pub struct AppTrayRegistry {
    menu    : Box <dyn MenuSink>,
    entries : Vec <AppTrayEntry>,
}

impl AppTrayRegistry {

    pub fn new (menu: Box<dyn MenuSink>) -> AppTrayRegistry {
        AppTrayRegistry { menu, entries: Vec::new() }
    }

    pub fn entries (&self) -> &[AppTrayEntry] { &self.entries }

    pub fn handle_for_entry (&self, entry_id:&str) -> Option<Hwnd> {
        self.entries .iter() .find (|e| e.entry_id == entry_id) .map (|e| e.hwnd)
    }

    /// Prunes dead entries and re-applies the whole menu. Pruning only sticks if the menu could be applied.
    pub fn rebuild_menu (&mut self, ws:&dyn WindowSystem) -> TrayResult<()> {
        let live = self.entries .iter() .filter (|e| ws.is_live(e.hwnd)) .cloned() .collect::<Vec<_>>();
        self.menu.apply_layout (&menu_layout(&live))?;
        if live.len() != self.entries.len() {
            info! ("pruned {} dead entries from tray menu", self.entries.len() - live.len());
        }
        self.entries = live;
        Ok(())
    }

    fn rebuild_menu_logged (&mut self, ws:&dyn WindowSystem) {
        if let Err(e) = self.rebuild_menu(ws) {
            warn! ("tray menu rebuild failed: {}", e);
        }
    }

    fn take_entry (&mut self, hwnd:Hwnd) -> Option<AppTrayEntry> {
        let idx = self.entries .iter() .position (|e| e.hwnd == hwnd)?;
        Some (self.entries.remove(idx))
    }

}


impl HidingBackend for AppTrayRegistry {

    fn via (&self) -> HideVia { HideVia::app_tray }

    fn hide (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()> {
        if hwnd == 0 { return Err (TrayError::InvalidHandle) }
        if self.contains(hwnd) { return Err (TrayError::AlreadyHidden (hwnd)) }
        check_hideable (ws, hwnd)?;

        let entry = AppTrayEntry {
            hwnd,
            entry_id     : entry_id_for (hwnd),
            title        : ws.window_text (hwnd),
            process_name : ws.process_image_name (ws.window_pid(hwnd))
                               .unwrap_or_else (|| WindowSnapshot::UNKNOWN_PROCESS_STR.to_string()),
        };
        // the menu has to take the new entry before we hide anything .. else the window could be stranded
        let mut next = self.entries .iter() .filter (|e| ws.is_live(e.hwnd)) .cloned() .collect::<Vec<_>>();
        next.push (entry);
        self.menu.apply_layout (&menu_layout(&next))?;

        ws.hide_window (hwnd);
        info! ("hid {:#x} to tray menu as {:?}", hwnd, next.last().map(|e| e.label()));
        self.entries = next;
        Ok(())
    }

    fn restore (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> TrayResult<()> {
        if !self.contains(hwnd) { return Err (TrayError::NotHidden (hwnd)) }
        let is_live = ws.is_live (hwnd);
        if is_live && !ws.show_and_foreground (hwnd) { return Err (TrayError::ShowRefused (hwnd)) }
        self.take_entry (hwnd);
        self.rebuild_menu_logged (ws);
        if !is_live { return Err (TrayError::WindowGone (hwnd)) }
        info! ("restored {:#x} from tray menu", hwnd);
        Ok(())
    }

    fn restore_all (&mut self, ws:&dyn WindowSystem) -> usize {
        let entries = std::mem::take (&mut self.entries);
        let mut n_shown = 0;
        entries .iter() .filter (|e| ws.is_live(e.hwnd)) .for_each (|e| {
            if ws.show_and_foreground (e.hwnd) { n_shown += 1 }
        } );
        self.rebuild_menu_logged (ws);
        n_shown
    }

    fn contains (&self, hwnd:Hwnd) -> bool {
        self.entries .iter() .any (|e| e.hwnd == hwnd)
    }

    fn drop_stale (&mut self, ws:&dyn WindowSystem, hwnd:Hwnd) -> bool {
        if self.take_entry(hwnd).is_none() { return false }
        self.rebuild_menu_logged (ws);
        true
    }

    fn hidden_hwnds (&self) -> Vec<Hwnd> {
        self.entries .iter() .map (|e| e.hwnd) .collect()
    }

    fn listing (&self, ws:&dyn WindowSystem) -> Vec<HiddenWindowInfo> {
        self.entries .iter() .filter (|e| ws.is_live(e.hwnd)) .map (|e| HiddenWindowInfo {
            hwnd         : e.hwnd,
            title        : e.title.clone(),
            process_name : e.process_name.clone(),
            via          : HideVia::app_tray,
        } ) .collect()
    }

    fn len (&self) -> usize { self.entries.len() }

}
