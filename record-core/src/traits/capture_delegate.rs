use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingSummary;
use crate::models::state::CaptureState;

/// Event delegate for controller notifications.
///
/// All methods are called on the main context thread. Implementations forward
/// to the command channel's event side and must not block.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: CaptureState);

    /// Called on each metering tick with the scaled level.
    fn on_decibel_changed(&self, decibels: f32);

    /// Called when a recorder fails after the session started.
    fn on_error(&self, error: &CaptureError);

    /// Called when a session is torn down.
    fn on_recording_finished(&self, summary: &RecordingSummary);
}
