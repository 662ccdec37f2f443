use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::error::CaptureError;

/// A named command with an untyped argument map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }

    pub fn with_arguments(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// String argument, or `None` when missing or not a string.
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Integer argument, or `None` when missing or not an integer.
    pub fn int_arg(&self, key: &str) -> Option<i64> {
        self.arguments.get(key).and_then(Value::as_i64)
    }

    /// Numeric argument; integers are widened.
    pub fn float_arg(&self, key: &str) -> Option<f64> {
        self.arguments.get(key).and_then(Value::as_f64)
    }
}

/// Exactly one reply is produced per [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Reply {
    Success {
        result: Value,
    },
    Error {
        code: String,
        message: String,
        details: Option<Value>,
    },
    NotImplemented,
}

impl Reply {
    pub fn null() -> Self {
        Self::Success { result: Value::Null }
    }

    pub fn bool(value: bool) -> Self {
        Self::Success {
            result: Value::Bool(value),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<&CaptureError> for Reply {
    fn from(error: &CaptureError) -> Self {
        match error {
            CaptureError::NotImplemented(_) => Self::NotImplemented,
            other => Self::Error {
                code: other.code().to_string(),
                message: other.to_string(),
                details: None,
            },
        }
    }
}

/// One-way notification sent from the controller to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub method: String,
    pub arguments: Value,
}

impl ChannelEvent {
    pub const DECIBEL_CHANGE: &'static str = "onDecibelChange";
    pub const STATE_CHANGE: &'static str = "onStateChange";
    pub const ERROR: &'static str = "onError";
    pub const RECORDING_FINISHED: &'static str = "onRecordingFinished";

    pub fn new(method: &str, arguments: Value) -> Self {
        Self {
            method: method.to_string(),
            arguments,
        }
    }
}
