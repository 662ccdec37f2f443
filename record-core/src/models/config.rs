use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::codec::AudioCodec;

/// Default encoder bit rate in bits per second.
pub const DEFAULT_BIT_RATE: u32 = 128_000;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Encoder quality tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Min,
    Low,
    Medium,
    #[default]
    High,
    Max,
}

impl AudioQuality {
    /// Raw quality value on the 0–127 scale platform encoders use.
    pub fn raw_value(&self) -> u8 {
        match self {
            Self::Min => 0,
            Self::Low => 0x20,
            Self::Medium => 0x40,
            Self::High => 0x60,
            Self::Max => 0x7F,
        }
    }
}

/// Settings a recorder is created with.
///
/// Immutable once the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub codec: AudioCodec,

    /// Encoder bit rate in bits per second (default: 128000).
    pub bit_rate: u32,

    /// Sample rate in Hz (default: 44100).
    pub sample_rate: f64,

    /// Number of channels (always 2 for commands from the channel).
    pub channels: u16,

    pub quality: AudioQuality,
}

impl RecordingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate <= 0.0 || !self.sample_rate.is_finite() {
            return Err(format!("sample rate must be positive: {}", self.sample_rate));
        }
        if self.bit_rate == 0 {
            return Err("bit rate must be positive".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        Ok(())
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            codec: AudioCodec::default(),
            bit_rate: DEFAULT_BIT_RATE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
            quality: AudioQuality::High,
        }
    }
}

/// Audio session category requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionCategory {
    Record,
    PlayAndRecord,
}

/// Routing options applied to the platform audio session before recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSessionOptions {
    pub category: SessionCategory,
    pub default_to_speaker: bool,
    pub allow_bluetooth: bool,
}

impl Default for AudioSessionOptions {
    fn default() -> Self {
        Self {
            category: SessionCategory::PlayAndRecord,
            default_to_speaker: true,
            allow_bluetooth: true,
        }
    }
}

/// Controller-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Level sampling period in milliseconds (default: 100).
    pub metering_interval_ms: u64,

    pub audio_session: AudioSessionOptions,
}

impl ControllerConfig {
    pub fn metering_interval(&self) -> Duration {
        Duration::from_millis(self.metering_interval_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.metering_interval_ms == 0 {
            return Err("metering interval must be non-zero".into());
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            metering_interval_ms: 100,
            audio_session: AudioSessionOptions::default(),
        }
    }
}

/// Destination the recorder writes to.
///
/// Opaque to the controller; backends call [`OutputTarget::resolve`] to
/// decide between a URL and a file path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputTarget(String);

/// An [`OutputTarget`] interpreted as either a URL or a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Url(String),
    File(PathBuf),
}

impl OutputTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Targets of the form `scheme://...` are URLs, anything else is a path.
    pub fn resolve(&self) -> ResolvedTarget {
        match self.0.split_once("://") {
            Some((scheme, _)) if is_url_scheme(scheme) => ResolvedTarget::Url(self.0.clone()),
            _ => ResolvedTarget::File(PathBuf::from(&self.0)),
        }
    }
}

fn is_url_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
