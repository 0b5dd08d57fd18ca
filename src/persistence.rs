use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::platform::Hwnd;


# [ derive (Debug, Clone) ]
pub struct HiddenStore {
    path : PathBuf,
}

impl HiddenStore {

    pub const DEFAULT_FILE_NAME : &'static str = "traymond_save.dat";

    pub fn new (path: impl Into<PathBuf>) -> HiddenStore {
        HiddenStore { path: path.into() }
    }

    pub fn path (&self) -> &Path { &self.path }


    /// Rewrites the whole record with the given handles, one raw value per line.
    /// Failures are logged and dropped .. the in-memory registry stays authoritative for this session.
    pub fn save (&self, hwnds: impl IntoIterator<Item = Hwnd>) {
        let content = hwnds .into_iter() .map (|h| format!("{}\n", h as usize)) .collect::<String>();
        if let Err(e) = fs::write (&self.path, content) {
            warn! ("could not write hidden-windows record {:?} : {}", self.path, e);
        }
    }

    /// Reads back whatever handles the record holds. Missing file, empty file and junk lines all just mean fewer handles.
    pub fn load (&self) -> Vec<Hwnd> {
        match fs::read_to_string (&self.path) {
            Ok (content) => parse_record (&content),
            Err (e) if e.kind() == io::ErrorKind::NotFound => vec![],
            Err (e) => {
                warn! ("could not read hidden-windows record {:?} : {}", self.path, e);
                vec![]
        }   }
    }

    pub fn clear (&self) {
        match fs::remove_file (&self.path) {
            Ok (_) => debug! ("removed hidden-windows record {:?}", self.path),
            Err (e) if e.kind() == io::ErrorKind::NotFound => { }
            Err (e) => warn! ("could not remove hidden-windows record {:?} : {}", self.path, e),
        }
    }

    pub fn exists (&self) -> bool { self.path.exists() }

}


fn parse_record (content:&str) -> Vec<Hwnd> {
    content .lines() .map (|l| l.trim()) .filter (|l| !l.is_empty())
        .filter_map (|l| match l.parse::<usize>() {
            Ok (v) if v != 0 => Some (v as Hwnd),
            _ => { debug! ("skipping unparseable record line {:?}", l); None }
        } )
        .collect()
}
