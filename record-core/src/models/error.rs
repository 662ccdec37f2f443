use thiserror::Error;

/// Errors surfaced by the capture controller.
///
/// `StartFailed` and `NotImplemented` are the only errors a command reply can
/// carry. `RecorderFailed` is reported asynchronously through the delegate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Failed to start recording")]
    StartFailed,

    #[error("method not implemented: {0}")]
    NotImplemented(String),

    #[error("recorder failed: {0}")]
    RecorderFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("main context is no longer running")]
    ContextClosed,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Error code used on the command channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StartFailed => "-1",
            Self::NotImplemented(_) => "not_implemented",
            Self::RecorderFailed(_) => "-3",
            Self::InvalidConfiguration(_) => "-4",
            Self::ContextClosed => "-5",
            Self::Unknown(_) => "-99",
        }
    }
}

/// Errors reported by a recorder backend.
///
/// These never reach a command reply directly; the controller logs them and
/// maps them onto [`CaptureError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("audio session configuration failed: {0}")]
    SessionConfiguration(String),

    #[error("audio session activation failed: {0}")]
    SessionActivation(String),

    #[error("recorder creation failed: {0}")]
    RecorderCreation(String),

    #[error("recording could not begin: {0}")]
    RecordFailed(String),

    #[error("encoding failed: {0}")]
    Encoding(String),
}
