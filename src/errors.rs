use thiserror::Error;

use crate::platform::Hwnd;


/// Everything that can make a tray operation fail.
///
/// Most of these are expected rejections and are part of the normal contract (no state was touched) ..
/// only the OS resource failures are worth a warning in the logs.
# [ derive (Error, Debug) ]
pub enum TrayError {

    #[error("invalid window handle")]
    InvalidHandle,

    #[error("window {0:#x} no longer exists")]
    WindowGone (Hwnd),

    #[error("window class {0:?} is protected and cannot be hidden")]
    Protected (String),

    #[error("already holding the maximum of {0} hidden windows")]
    CapacityReached (usize),

    #[error("window {0:#x} is already hidden")]
    AlreadyHidden (Hwnd),

    #[error("window {0:#x} is not hidden")]
    NotHidden (Hwnd),

    #[error("window {0:#x} refused to be shown")]
    ShowRefused (Hwnd),

    #[error("no hidden windows to restore")]
    NothingToRestore,

    #[error("failed to register notification icon: {0}")]
    IconRegistration (String),

    #[error("failed to update tray menu: {0}")]
    MenuUpdate (String),

    #[error("io error: {0}")]
    Io (#[from] std::io::Error),

}

impl TrayError {

    /// Expected rejections (denylist, capacity, stale or unknown handles) as opposed to OS resource failures
    pub fn is_rejection (&self) -> bool {
        !matches! (self,
            TrayError::ShowRefused(_) |
            TrayError::IconRegistration(_) |
            TrayError::MenuUpdate(_) |
            TrayError::Io(_)
        )
    }

}

pub type TrayResult<T> = Result<T, TrayError>;
