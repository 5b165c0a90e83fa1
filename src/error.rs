//! Error type shared by the library modules.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FocusError>;

#[derive(Error, Debug)]
pub enum FocusError {
    /// `start` was called while a countdown is already running
    #[error("a focus session is already running")]
    AlreadyRunning,

    /// `stop` was called while the timer is idle
    #[error("no focus session is running")]
    NotRunning,

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
