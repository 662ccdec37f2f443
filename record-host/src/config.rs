use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use record_core::ControllerConfig;

use crate::error::HostError;

/// Settings for the stdio host.
///
/// ```json
/// { "controller": { "metering_interval_ms": 100 }, "permission_answer": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub controller: ControllerConfig,

    /// Answer given to the simulated permission prompt. `None` leaves
    /// prompts unanswered.
    pub permission_answer: Option<bool>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            permission_answer: Some(true),
        }
    }
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let config_error = |reason: String| HostError::Config {
            path: path.display().to_string(),
            reason,
        };
        let json = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: HostConfig = serde_json::from_str(&json)?;
        config.controller.validate().map_err(config_error)?;
        Ok(config)
    }
}
