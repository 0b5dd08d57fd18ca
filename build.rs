
fn main() {

    // the tauri shell (and so its generated context) only exists for windows builds ..
    // .. everything else is the plain library, which needs no build step
    #[cfg(windows)]
    tauri_build::try_build (
        tauri_build::Attributes::new()
    ).expect ("failed to run build script");

}
