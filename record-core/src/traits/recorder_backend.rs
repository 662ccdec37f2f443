use std::sync::Arc;

use crate::models::config::{AudioSessionOptions, OutputTarget, RecordingConfig};
use crate::models::error::DeviceError;
use crate::traits::recorder_listener::RecorderListener;

/// Platform audio facility the controller drives.
///
/// Implemented by:
/// - `SimulatedBackend` (in-memory, used by tests and the stdio host)
/// - Future: AVFoundation and MediaRecorder bindings
pub trait RecorderBackend: Send {
    type Recorder: Recorder + 'static;

    /// Apply category and routing options to the shared audio session.
    fn configure_session(&mut self, options: &AudioSessionOptions) -> Result<(), DeviceError>;

    /// Activate or deactivate the shared audio session.
    fn set_session_active(&mut self, active: bool) -> Result<(), DeviceError>;

    /// Create a recorder writing to `target`.
    ///
    /// `listener` is the only receiver of the recorder's asynchronous events.
    fn create_recorder(
        &mut self,
        target: &OutputTarget,
        config: &RecordingConfig,
        listener: Arc<dyn RecorderListener>,
    ) -> Result<Self::Recorder, DeviceError>;
}

/// A single recorder instance (the device handle).
///
/// Dropping the recorder releases it; `stop` is always called first.
pub trait Recorder: Send {
    fn set_metering_enabled(&mut self, enabled: bool);

    /// Begin or continue recording.
    fn record(&mut self) -> Result<(), DeviceError>;

    fn pause(&mut self);

    fn stop(&mut self);

    /// Refresh the values returned by [`Recorder::average_power`].
    fn update_meters(&mut self);

    /// Average power of `channel` in dBFS. Nominally ≤ 0.0.
    fn average_power(&self, channel: usize) -> f32;
}
