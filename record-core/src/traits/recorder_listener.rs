use crate::models::error::DeviceError;

/// Receiver for asynchronous recorder notifications.
///
/// Called from whatever thread the backend uses. Implementations must
/// redispatch onto the main context before touching session state.
pub trait RecorderListener: Send + Sync {
    /// The recorder finished, either because it was stopped or because the
    /// platform ended it.
    fn on_finished(&self, successfully: bool);

    /// The encoder hit an unrecoverable error.
    fn on_encode_error(&self, error: DeviceError);
}
