//! In-memory recorder backend.
//!
//! Stands in for the platform audio facility in tests and in the stdio host.
//! Every backend, recorder and permission provider created from one
//! [`SimulatedDevice`] shares its state, so callers can script failures,
//! power readings and permission answers, and inspect what the controller did.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::codec::AudioContainer;
use crate::models::config::{AudioSessionOptions, OutputTarget, RecordingConfig, ResolvedTarget};
use crate::models::error::DeviceError;
use crate::models::permission::PermissionStatus;
use crate::traits::permission_provider::{PermissionCompletion, PermissionProvider};
use crate::traits::recorder_backend::{Recorder, RecorderBackend};
use crate::traits::recorder_listener::RecorderListener;

/// Reading returned while metering is disabled.
pub const SILENCE_DB: f32 = -160.0;

/// Stage at which the simulated backend should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    ConfigureSession,
    ActivateSession,
    CreateRecorder,
    Record,
}

/// How the simulated backend interpreted a recorder's target and config.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderSettings {
    pub destination: ResolvedTarget,
    pub container: AudioContainer,
    pub format_id: u32,
    pub encoder_id: i64,
    pub quality: u8,
}

impl RecorderSettings {
    fn new(target: &OutputTarget, config: &RecordingConfig) -> Self {
        Self {
            destination: target.resolve(),
            container: config.codec.container(),
            format_id: config.codec.format_id(),
            encoder_id: config.codec.encoder_id(),
            quality: config.quality.raw_value(),
        }
    }
}

/// Counters and flags describing what happened to the simulated device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub session_options: Option<AudioSessionOptions>,
    pub session_active: bool,
    pub recorders_created: usize,
    pub recorders_stopped: usize,
    pub recorders_released: usize,
    pub live_recorders: usize,
    pub record_calls: usize,
    pub pause_calls: usize,
    pub meter_updates: usize,
    pub last_target: Option<OutputTarget>,
    pub last_config: Option<RecordingConfig>,
    pub last_settings: Option<RecorderSettings>,
    pub permission_requests: usize,
}

impl DeviceSnapshot {
    /// Whether a recorder currently holds the device.
    pub fn has_live_recorder(&self) -> bool {
        self.live_recorders > 0
    }
}

struct DeviceState {
    snapshot: DeviceSnapshot,
    failure: Option<FailureStage>,
    power_script: VecDeque<f32>,
    permission: PermissionStatus,
    pending_prompts: Vec<PermissionCompletion>,
    auto_answer: Option<bool>,
    listener: Option<Arc<dyn RecorderListener>>,
}

/// Shared handle to one simulated microphone.
#[derive(Clone)]
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                snapshot: DeviceSnapshot::default(),
                failure: None,
                power_script: VecDeque::new(),
                permission: PermissionStatus::Undetermined,
                pending_prompts: Vec::new(),
                auto_answer: None,
                listener: None,
            })),
        }
    }

    pub fn backend(&self) -> SimulatedBackend {
        SimulatedBackend {
            device: self.clone(),
        }
    }

    pub fn permissions(&self) -> SimulatedPermissions {
        SimulatedPermissions {
            device: self.clone(),
        }
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.state.lock().snapshot.clone()
    }

    /// Fail every call at `stage` until cleared with `None`.
    pub fn set_failure(&self, stage: Option<FailureStage>) {
        self.state.lock().failure = stage;
    }

    /// Queue power readings returned by successive `update_meters` calls.
    ///
    /// Once the queue is empty the device produces a slowly varying
    /// synthetic level.
    pub fn push_power(&self, readings: &[f32]) {
        self.state.lock().power_script.extend(readings.iter().copied());
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        self.state.lock().permission = status;
    }

    /// Answer future prompts immediately instead of leaving them pending.
    pub fn set_auto_answer(&self, answer: Option<bool>) {
        self.state.lock().auto_answer = answer;
    }

    /// Answer every outstanding permission prompt.
    ///
    /// Completions run on the calling thread, after the device lock is
    /// released.
    pub fn answer_permission_prompts(&self, granted: bool) {
        let prompts = {
            let mut state = self.state.lock();
            state.permission = if granted {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            };
            std::mem::take(&mut state.pending_prompts)
        };
        for completion in prompts {
            completion(granted);
        }
    }

    /// Simulate the platform ending the most recent recorder on its own.
    pub fn finish_recording(&self, successfully: bool) {
        if let Some(listener) = self.current_listener() {
            listener.on_finished(successfully);
        }
    }

    /// Simulate an encoder failure on the most recent recorder.
    pub fn fail_encoding(&self, message: &str) {
        if let Some(listener) = self.current_listener() {
            listener.on_encode_error(DeviceError::Encoding(message.to_string()));
        }
    }

    fn current_listener(&self) -> Option<Arc<dyn RecorderListener>> {
        self.state.lock().listener.clone()
    }

    fn check_failure(&self, stage: FailureStage) -> bool {
        self.state.lock().failure == Some(stage)
    }
}

/// [`RecorderBackend`] over a [`SimulatedDevice`].
pub struct SimulatedBackend {
    device: SimulatedDevice,
}

impl RecorderBackend for SimulatedBackend {
    type Recorder = SimulatedRecorder;

    fn configure_session(&mut self, options: &AudioSessionOptions) -> Result<(), DeviceError> {
        if self.device.check_failure(FailureStage::ConfigureSession) {
            return Err(DeviceError::SessionConfiguration("category rejected".into()));
        }
        self.device.state.lock().snapshot.session_options = Some(*options);
        Ok(())
    }

    fn set_session_active(&mut self, active: bool) -> Result<(), DeviceError> {
        if active && self.device.check_failure(FailureStage::ActivateSession) {
            return Err(DeviceError::SessionActivation("session busy".into()));
        }
        self.device.state.lock().snapshot.session_active = active;
        Ok(())
    }

    fn create_recorder(
        &mut self,
        target: &OutputTarget,
        config: &RecordingConfig,
        listener: Arc<dyn RecorderListener>,
    ) -> Result<SimulatedRecorder, DeviceError> {
        if target.is_empty() {
            return Err(DeviceError::RecorderCreation("empty output target".into()));
        }
        if self.device.check_failure(FailureStage::CreateRecorder) {
            return Err(DeviceError::RecorderCreation("unsupported settings".into()));
        }

        let mut state = self.device.state.lock();
        state.snapshot.recorders_created += 1;
        state.snapshot.live_recorders += 1;
        state.snapshot.last_target = Some(target.clone());
        state.snapshot.last_config = Some(config.clone());
        state.snapshot.last_settings = Some(RecorderSettings::new(target, config));
        state.listener = Some(Arc::clone(&listener));

        Ok(SimulatedRecorder {
            device: self.device.clone(),
            listener,
            status: RecorderStatus::Prepared,
            metering_enabled: false,
            power: SILENCE_DB,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecorderStatus {
    Prepared,
    Recording,
    Paused,
    Stopped,
}

/// Device handle produced by [`SimulatedBackend`].
pub struct SimulatedRecorder {
    device: SimulatedDevice,
    listener: Arc<dyn RecorderListener>,
    status: RecorderStatus,
    metering_enabled: bool,
    power: f32,
}

impl SimulatedRecorder {
    pub fn is_recording(&self) -> bool {
        self.status == RecorderStatus::Recording
    }
}

impl Recorder for SimulatedRecorder {
    fn set_metering_enabled(&mut self, enabled: bool) {
        self.metering_enabled = enabled;
    }

    fn record(&mut self) -> Result<(), DeviceError> {
        if self.device.check_failure(FailureStage::Record) {
            return Err(DeviceError::RecordFailed("input unavailable".into()));
        }
        if self.status == RecorderStatus::Stopped {
            return Err(DeviceError::RecordFailed("recorder already stopped".into()));
        }
        self.status = RecorderStatus::Recording;
        self.device.state.lock().snapshot.record_calls += 1;
        Ok(())
    }

    fn pause(&mut self) {
        if self.status == RecorderStatus::Recording {
            self.status = RecorderStatus::Paused;
        }
        self.device.state.lock().snapshot.pause_calls += 1;
    }

    fn stop(&mut self) {
        if self.status == RecorderStatus::Stopped {
            return;
        }
        self.status = RecorderStatus::Stopped;
        self.device.state.lock().snapshot.recorders_stopped += 1;
        self.listener.on_finished(true);
    }

    fn update_meters(&mut self) {
        if !self.metering_enabled {
            self.power = SILENCE_DB;
            return;
        }
        let mut state = self.device.state.lock();
        state.snapshot.meter_updates += 1;
        let tick = state.snapshot.meter_updates;
        self.power = state
            .power_script
            .pop_front()
            .unwrap_or_else(|| synthetic_level(tick));
    }

    fn average_power(&self, _channel: usize) -> f32 {
        if self.metering_enabled {
            self.power
        } else {
            SILENCE_DB
        }
    }
}

impl Drop for SimulatedRecorder {
    fn drop(&mut self) {
        let mut state = self.device.state.lock();
        state.snapshot.live_recorders = state.snapshot.live_recorders.saturating_sub(1);
        state.snapshot.recorders_released += 1;
    }
}

/// Speech-like level between -55 and -25 dBFS.
fn synthetic_level(tick: usize) -> f32 {
    -40.0 + 15.0 * (tick as f32 * 0.35).sin()
}

/// [`PermissionProvider`] over a [`SimulatedDevice`].
///
/// Prompts stay pending until [`SimulatedDevice::answer_permission_prompts`]
/// unless an automatic answer is configured.
pub struct SimulatedPermissions {
    device: SimulatedDevice,
}

impl PermissionProvider for SimulatedPermissions {
    fn status(&self) -> PermissionStatus {
        self.device.state.lock().permission
    }

    fn request(&mut self, completion: PermissionCompletion) {
        let answer = {
            let mut state = self.device.state.lock();
            state.snapshot.permission_requests += 1;
            match state.auto_answer {
                Some(granted) => {
                    state.permission = if granted {
                        PermissionStatus::Granted
                    } else {
                        PermissionStatus::Denied
                    };
                    Some((granted, completion))
                }
                None => {
                    state.pending_prompts.push(completion);
                    None
                }
            }
        };
        if let Some((granted, completion)) = answer {
            completion(granted);
        }
    }
}
