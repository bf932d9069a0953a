use thiserror::Error;

/// Errors that end a scan session.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0} is not running or cannot be found. Start it and try again")]
    WindowNotFound(String),

    #[error("Window is not ready: {0}")]
    WindowNotReady(String),

    #[error("Can not scan depot from here, please navigate to the main menu or the depot")]
    UnknownScreen,

    #[error("Unexpected capture size {actual:?}, expected {expected:?}. Check the window border settings")]
    ResolutionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Input failed: {0}")]
    InputFailed(String),

    #[error("A scan is already running")]
    AlreadyRunning,
}
