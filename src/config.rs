#![ allow (non_snake_case, non_upper_case_globals) ]

use std::{fs, time};
use std::ops::{Deref, Not};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use once_cell::sync::{Lazy, OnceCell};
use toml_edit::DocumentMut;

use tracing::metadata::LevelFilter;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::prelude::*;

use crate::control::{ControlSettings, Flag};
use crate::native_tray::NativeTrayRegistry;
use crate::persistence::HiddenStore;





# [ derive (Debug, Clone) ]
/// Deferred Executor sets up a deferred action until a (pushable/resettable) deadline has passed
pub struct DeferredExecutor {
    deadline : Arc <Mutex <SystemTime>>,
}

/// Action type to pass in to a DeferredExecutor
pub type Action = Arc < dyn Fn() + Send + Sync + 'static >;




# [ derive (Debug) ]
pub struct _Config {
    pub toml        : RwLock <Option <DocumentMut>>,
    pub default     : DocumentMut,
    pub log_ready   : Flag,
    pub file_backed : bool,
}


# [ derive (Debug, Clone) ]
pub struct Config ( Arc <_Config> );

impl Deref for Config {
    type Target = _Config;
    fn deref (&self) -> &_Config { &self.0 }
}





// first some module level helper functions ..
/// Returns the directory of the currently running executable
fn get_app_dir () -> Option<PathBuf> {
    std::env::current_exe().ok() .and_then (|p| p.parent() .map (|p| p.to_path_buf()))
}

/// Checks whether a path is writeable by the current user by attempting to open/create a file in write mode
fn is_writeable (path: &Path) -> bool {
    fs::OpenOptions::new().write(true).create(true).truncate(false).open(path).is_ok()
    // note that ^^ this is similar to 'touch' and will create an empty file if it doesnt exist
}

fn default_doc () -> DocumentMut {
    DocumentMut::from_str (include_str!("../traynex.conf.toml")) .unwrap_or_default()
    // ^^ our traynex.conf.toml is at root of project, the include_str macro will load the contents at compile time
}




impl Config {

    pub fn instance () -> Config {
        static INSTANCE: OnceCell <Config> = OnceCell::new();
        INSTANCE .get_or_init ( || {
            let conf = Config ( Arc::new ( _Config {
                toml        : RwLock::new (None),
                default     : default_doc(),
                log_ready   : Flag::default(),
                file_backed : true,
            } ) );
            conf.load();
            conf
        } ) .clone()
    }

    /// A config parsed from the given text, never read from or written back to disk.
    /// Unparseable text behaves like an absent file (all defaults).
    pub fn load_from_str (toml_str:&str) -> Config {
        Config ( Arc::new ( _Config {
            toml        : RwLock::new (DocumentMut::from_str(toml_str).ok()),
            default     : default_doc(),
            log_ready   : Flag::default(),
            file_backed : false,
        } ) )
    }

    pub const CONF_FILE_NAME  : &'static str = "traynex.conf.toml";
    pub const LOG_FILE_PREFIX : &'static str = "traynex_log";

    pub const TRAYNEX_VERSION : &'static str = env!("CARGO_PKG_VERSION");

    pub const MAX_HIDDEN_WINDOWS_LIMIT : u32 = 500;
    pub const MIN_REFRESH_INTERVAL_MS  : u32 = 100;


    fn get_config_file (&self) -> Option<PathBuf> {
        if !self.file_backed { return None }
        let app_dir_loc = get_app_dir() .map (|p| p.join(Self::CONF_FILE_NAME));
        if app_dir_loc.as_ref() .is_some_and (|p| is_writeable(p)) {
            return app_dir_loc
        }
        let data_dir = dirs::data_local_dir() .map (|p| p.join("Traynex"));
        if let Some(dir) = data_dir.as_ref() .filter (|p| !p.exists()) {
            let _ = fs::create_dir (dir);
        }
        let data_dir_loc = data_dir .map (|p| p.join(Self::CONF_FILE_NAME));
        if data_dir_loc .as_ref() .is_some_and (|p| is_writeable(p)) {
            return data_dir_loc
        }
        None
    }
    pub fn get_log_loc (&self) -> Option<PathBuf> {
        self.get_config_file() .and_then (|p| p.parent() .map (|p| p.to_path_buf()))
    }


    pub fn trigger_config_file_reset (&self) {
        self.toml.write().unwrap() .replace (self.default.clone());
        self.write_back_toml();
    }


    pub fn load (&self) {
        if let Some(conf_path) = self.get_config_file().as_ref() {
            if let Ok(cfg_str) = fs::read_to_string(conf_path) {
                if !cfg_str.trim().is_empty() {
                    if let Ok(toml) = DocumentMut::from_str(&cfg_str) {
                        // successfully read and parsed a writeable non-empty toml, we'll use that
                        self.toml.write().unwrap().replace(toml);
                        return
        }   }   }  }
        // there's no writeable location, or the file was empty, or we failed to read or parse it .. load default and write back
        self.trigger_config_file_reset();
    }

    pub fn setup_log_subscriber (&self) -> Result <WorkerGuard, ()> {

        if self.check_flag__logging_enabled().not() || self.log_ready.is_set() {
            return Err(())
        }

        let log_loc = self.get_log_loc() .ok_or(())?;

        let log_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(Self::LOG_FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(7)
            .build(log_loc)
            .map_err (|_e| ())?;

        let (nb_log_appender, guard) = non_blocking (log_appender);

        let timer = LocalTime::new ( ::time::format_description::parse (
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        ).map_err (|_e| ())? );

        let subscriber = tracing_subscriber::fmt::Layer::new()
            .with_writer(nb_log_appender)
            .with_timer(timer)
            .with_ansi(false)
            .with_filter(self.get_log_level());

        tracing_subscriber::registry().with(subscriber).try_init() .map_err (|_e| ())?;
        self.log_ready.set();

        Ok(guard)
    }


    fn write_back_toml (&self) {
        let Some(conf_path) = self.get_config_file() else { return };
        let _ = fs::write (
            conf_path,
            self.toml.read().unwrap().as_ref() .map (|d| d.to_string()).unwrap_or_default()
        );
    }
    fn write_back_toml_if_changed (&self) {
        let Some(conf_path) = self.get_config_file() else { return };
        let toml_str = self.toml.read().unwrap().as_ref() .map (|d| d.to_string()) .unwrap_or_default();
        let old_toml_str = fs::read_to_string (&conf_path) .unwrap_or_default();
        if toml_str != old_toml_str {
            let _ = fs::write (conf_path, toml_str);
        }
    }
    pub fn deferred_write_back_toml (&self) {
        static dfr_ex: Lazy<DeferredExecutor> = Lazy::new (DeferredExecutor::default);
        if !self.file_backed { return }
        let conf = self.clone();
        let action = Arc::new (move || conf.write_back_toml_if_changed());
        dfr_ex .setup_deferred_action (action, time::Duration::from_millis(300));
    }



    fn check_flag (&self, flag_name:&str) -> bool {
        self.toml.read().unwrap().as_ref()
            .and_then (|t| t.get(flag_name))
            .and_then (|t| t.as_bool())
            .or_else (|| self.default.get(flag_name) .and_then (|t| t.as_bool()))
            .unwrap_or_default()
    }
    fn set_flag (&self, flag_name:&str, flag_val:bool) {
        if let Some(toml) = self.toml.write().unwrap().as_mut() {   // serves as re-entrancy guard too
            toml [flag_name] = toml_edit::value (flag_val);
        }
        self.deferred_write_back_toml();
    }

    fn get_number (&self, key:&str) -> i64 {
        self.toml.read().unwrap().as_ref()
            .and_then (|t| t.get(key))
            .and_then (|t| t.as_integer())
            .or_else (|| self.default.get(key) .and_then (|t| t.as_integer()))
            .unwrap_or_default()
    }

    fn get_string (&self, key:&str) -> String {
        self.toml.read().unwrap().as_ref()
            .and_then (|t| t.get(key))
            .and_then (|t| t.as_str()) .map (|s| s.to_string())
            .or_else (|| self.default.get(key) .and_then (|t| t.as_str()) .map (|s| s.to_string()))
            .unwrap_or_default()
    }

    fn get_string_array (&self, key:&str) -> Vec<String> {
        fn strs (item:&toml_edit::Item) -> Option<Vec<String>> {
            item.as_array() .map (|a| a.iter() .filter_map (|v| v.as_str().map(|s| s.to_string())) .collect())
        }
        self.toml.read().unwrap() .as_ref()
            .and_then (|t| t.get(key)) .and_then (strs)
            .or_else (|| self.default.get(key) .and_then (strs))
            .unwrap_or_default()
    }



    // all the config flags we can check
    pub fn check_flag__hotkey_enabled        (&self) -> bool { self.check_flag ( "hotkey_enabled"       ) }
    pub fn check_flag__auto_refresh_enabled  (&self) -> bool { self.check_flag ( "auto_refresh_enabled" ) }
    pub fn check_flag__always_on_top         (&self) -> bool { self.check_flag ( "always_on_top"        ) }
    pub fn check_flag__logging_enabled       (&self) -> bool { self.check_flag ( "logging_enabled"      ) }

    // the few flags the UI can flip .. the rest are changed directly in the config file
    pub fn deferred_update_conf__hotkey_enabled       (&self, enabled:bool) { self.set_flag ("hotkey_enabled", enabled) }
    pub fn deferred_update_conf__auto_refresh_enabled (&self, enabled:bool) { self.set_flag ("auto_refresh_enabled", enabled) }


    pub fn get_log_level (&self) -> LevelFilter {
        if !self.check_flag__logging_enabled() {
            return LevelFilter::OFF;
        }
        match self.get_string("logging_level").to_uppercase().as_str() {
            "TRACE" => LevelFilter::TRACE,
            "DEBUG" => LevelFilter::DEBUG,
            "WARN"  => LevelFilter::WARN,
            "ERROR" => LevelFilter::ERROR,
            "OFF"   => LevelFilter::OFF,
            _       => LevelFilter::INFO,
        }
    }


    pub fn get_max_hidden_windows (&self) -> usize {
        let n = self.get_number("max_hidden_windows");
        if n <= 0 { return NativeTrayRegistry::DEFAULT_CAPACITY }
        n.min (Self::MAX_HIDDEN_WINDOWS_LIMIT as i64) as usize
    }

    pub fn get_refresh_interval (&self) -> time::Duration {
        let ms = self.get_number("refresh_interval_ms") .max (Self::MIN_REFRESH_INTERVAL_MS as i64);
        time::Duration::from_millis (ms as u64)
    }

    pub fn get_save_file (&self) -> PathBuf {
        let s = self.get_string("save_file");
        if s.trim().is_empty() { PathBuf::from (HiddenStore::DEFAULT_FILE_NAME) } else { PathBuf::from (s.trim()) }
    }

    pub fn get_hide_foreground_hotkeys (&self) -> Vec<String> { self.get_string_array ("hide_foreground_hotkeys") }


    pub fn control_settings (&self) -> ControlSettings {
        ControlSettings {
            hotkey_enabled       : self.check_flag__hotkey_enabled(),
            auto_refresh_enabled : self.check_flag__auto_refresh_enabled(),
            refresh_interval     : self.get_refresh_interval(),
        }
    }

}




impl Default for DeferredExecutor {
    fn default () -> Self { Self::new() }
}
impl DeferredExecutor {

    pub fn new () -> Self {
        Self { deadline: Arc::new (Mutex::new (SystemTime::UNIX_EPOCH)) }
    }
    pub fn set_deferral_dur (&self, dur:time::Duration) -> Self {
        if let Some(t) = SystemTime::now().checked_add(dur) {
            *self.deadline.lock().unwrap() = t
        }
        self.clone()
    }
    pub fn is_reset (&self) -> bool {
        *self.deadline.lock().unwrap() == SystemTime::UNIX_EPOCH
    }
    pub fn is_due (&self) -> bool {
        !self.is_reset() && *self.deadline.lock().unwrap() < SystemTime::now()
    }

    fn check_defered_action (&self, action:Action) {
        // if nobody already completed the action (and reset the time), and its time, we'll trigger it
        // (else, someone else moved the deadline and is waiting for it, so we can exit)
        if self.is_due() {
            let mut deadline = self.deadline.lock().unwrap();
            action();
            *deadline = SystemTime::UNIX_EPOCH;
        }
    }

    /// Sets up a deferred action which will only trigger after a deferrable deadline has passed.<br>
    /// Any subsequent calls to setup deferred action on this deadline will postpone this deadline (if pending).<br>
    /// When the deadline triggers, (only) the last set action will be executed.
    pub fn setup_deferred_action (&self, action:Action, delay:time::Duration) {
        let dfr_ex = self.clone();
        dfr_ex.set_deferral_dur(delay);
        std::thread::spawn ( move || {
            std::thread::sleep (delay);
            dfr_ex.check_defered_action(action);
        } );
    }

}
