use crate::channel::method_call::MethodCall;
use crate::models::codec::AudioCodec;
use crate::models::config::{OutputTarget, RecordingConfig, DEFAULT_BIT_RATE, DEFAULT_SAMPLE_RATE};

/// Arguments of the `start` command after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct StartRequest {
    pub path: String,
    pub encoder: i64,
    pub bit_rate: i64,
    pub sampling_rate: f64,
}

impl Default for StartRequest {
    fn default() -> Self {
        Self {
            path: String::new(),
            encoder: 0,
            bit_rate: i64::from(DEFAULT_BIT_RATE),
            sampling_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl StartRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn output_target(&self) -> OutputTarget {
        OutputTarget::new(self.path.clone())
    }

    /// Build the recorder settings. Channel count and quality are fixed.
    pub fn recording_config(&self) -> RecordingConfig {
        let bit_rate = u32::try_from(self.bit_rate).unwrap_or_else(|_| {
            log::warn!("bit rate {} out of range, using {}", self.bit_rate, DEFAULT_BIT_RATE);
            DEFAULT_BIT_RATE
        });
        RecordingConfig {
            codec: AudioCodec::from_encoder_id(self.encoder),
            bit_rate,
            sample_rate: self.sampling_rate,
            ..Default::default()
        }
    }
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(StartRequest),
    Stop,
    Pause,
    Resume,
    IsPaused,
    IsRecording,
    HasPermission,
    Unknown(String),
}

impl Command {
    /// Decode a method call. Missing or mistyped `start` arguments take their
    /// defaults.
    pub fn parse(call: &MethodCall) -> Self {
        match call.method.as_str() {
            "start" => {
                let defaults = StartRequest::default();
                Self::Start(StartRequest {
                    path: call.str_arg("path").map(str::to_owned).unwrap_or(defaults.path),
                    encoder: call.int_arg("encoder").unwrap_or(defaults.encoder),
                    bit_rate: call.int_arg("bitRate").unwrap_or(defaults.bit_rate),
                    sampling_rate: call.float_arg("samplingRate").unwrap_or(defaults.sampling_rate),
                })
            }
            "stop" => Self::Stop,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "isPaused" => Self::IsPaused,
            "isRecording" => Self::IsRecording,
            "hasPermission" => Self::HasPermission,
            other => Self::Unknown(other.to_string()),
        }
    }
}
