use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codec::AudioCodec;
use super::config::OutputTarget;

/// Summary of a session, produced when it is torn down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub id: uuid::Uuid,
    pub output_target: OutputTarget,
    pub codec: AudioCodec,
    pub started_at: DateTime<Utc>,
    /// Time spent recording, excluding pauses.
    pub duration_secs: f64,
}
