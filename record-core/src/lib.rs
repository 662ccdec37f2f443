//! # record-core
//!
//! Platform-agnostic microphone recording controller.
//!
//! Receives named commands (`start`, `stop`, `pause`, `resume`, `isPaused`,
//! `isRecording`, `hasPermission`), drives a single recorder through a
//! pluggable backend, samples its level every 100 ms while recording, and
//! tears the session down when the host application is backgrounded or
//! terminated. Platform backends implement `RecorderBackend` and
//! `PermissionProvider` and plug into the generic `CaptureController`.
//!
//! ## Architecture
//!
//! ```text
//! record-core (this crate)
//! ├── channel/    ← MethodCall, Reply, ChannelEvent, Command decoding
//! ├── models/     ← CaptureError, CaptureState, RecordingConfig, AudioCodec, etc.
//! ├── session/    ← CaptureController, MainContext, MeteringTimer, PermissionNegotiator
//! ├── traits/     ← RecorderBackend, Recorder, RecorderListener, PermissionProvider, CaptureDelegate
//! └── simulated   ← in-memory backend for tests and the stdio host
//! ```

pub mod channel;
pub mod models;
pub mod session;
pub mod simulated;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use channel::command::{Command, StartRequest};
pub use channel::method_call::{ChannelEvent, MethodCall, Reply};
pub use models::codec::{AudioCodec, AudioContainer};
pub use models::config::{
    AudioQuality, AudioSessionOptions, ControllerConfig, OutputTarget, RecordingConfig,
    ResolvedTarget, SessionCategory,
};
pub use models::error::{CaptureError, DeviceError};
pub use models::lifecycle::LifecycleEvent;
pub use models::permission::PermissionStatus;
pub use models::recording_result::RecordingSummary;
pub use models::state::CaptureState;
pub use session::controller::CaptureController;
pub use session::main_context::{Mailbox, MainContext, Message, RecorderEvent};
pub use simulated::{FailureStage, RecorderSettings, SimulatedDevice};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::permission_provider::{PermissionCompletion, PermissionProvider};
pub use traits::recorder_backend::{Recorder, RecorderBackend};
pub use traits::recorder_listener::RecorderListener;
