use serde::{Deserialize, Serialize};

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → recording ↔ paused
///            ↓         ↓
///          stopped ← ──┘
/// ```
/// `start` is accepted from every state and always passes through a teardown
/// of the previous session first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    #[default]
    Idle,
    Recording,
    Paused,
    Stopped,
}

impl CaptureState {
    /// Whether a device handle exists in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}
