use thiserror::Error;

use record_core::CaptureError;

/// Errors that stop the host bridge.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read config {path}: {reason}")]
    Config { path: String, reason: String },

    #[error(transparent)]
    Capture(#[from] CaptureError),
}
