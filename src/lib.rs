pub mod platform;
pub mod errors;

pub mod enumeration;
pub mod refresh;
pub mod recency;
pub mod persistence;

pub mod backend;
pub mod native_tray;
pub mod app_tray;
pub mod manager;
pub mod window_ops;

pub mod control;
pub mod config;

#[cfg(windows)]
pub mod win_apis;
#[cfg(windows)]
pub mod win_platform;
#[cfg(windows)]
pub mod tauri;
