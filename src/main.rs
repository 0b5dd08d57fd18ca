// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr (
    all ( not(debug_assertions), target_os = "windows" ),
    windows_subsystem = "windows"
)]

use traynex::config::Config;


fn main() {

    let conf = Config::instance();

    // we want the non-blocking log-appender guard to be here in main, to ensure any pending logs get flushed upon crash etc
    let _guard = conf.setup_log_subscriber();

    tracing::info! ("Starting Traynex {} ...", Config::TRAYNEX_VERSION);

    #[cfg(windows)]
    traynex::tauri::run_traynex_tauri ( &conf );

    #[cfg(not(windows))]
    tracing::error! ("Traynex hides windows into the Windows notification area, and only runs on Windows");

}
