use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::channel::command::{Command, StartRequest};
use crate::channel::method_call::{MethodCall, Reply};
use crate::models::config::{ControllerConfig, OutputTarget, RecordingConfig};
use crate::models::error::{CaptureError, DeviceError};
use crate::models::lifecycle::LifecycleEvent;
use crate::models::recording_result::RecordingSummary;
use crate::models::state::CaptureState;
use crate::session::main_context::{Mailbox, Message, RecorderEvent};
use crate::session::metering::{self, MeteringTimer};
use crate::session::permission::PermissionNegotiator;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::permission_provider::PermissionProvider;
use crate::traits::recorder_backend::{Recorder, RecorderBackend};
use crate::traits::recorder_listener::RecorderListener;

/// A started recording. Owns the device handle and its metering timer.
struct ActiveSession<R: Recorder> {
    id: Uuid,
    target: OutputTarget,
    config: RecordingConfig,
    recorder: R,
    metering: Option<MeteringTimer>,
    started_at: DateTime<Utc>,
    clock: Instant,
    paused_total: Duration,
    paused_since: Option<Instant>,
}

impl<R: Recorder> ActiveSession<R> {
    fn new(id: Uuid, target: OutputTarget, config: RecordingConfig, recorder: R) -> Self {
        Self {
            id,
            target,
            config,
            recorder,
            metering: None,
            started_at: Utc::now(),
            clock: Instant::now(),
            paused_total: Duration::ZERO,
            paused_since: None,
        }
    }

    fn metering_generation(&self) -> Option<u64> {
        self.metering.as_ref().map(MeteringTimer::generation)
    }

    fn mark_paused(&mut self) {
        if self.paused_since.is_none() {
            self.paused_since = Some(Instant::now());
        }
    }

    fn mark_resumed(&mut self) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += since.elapsed();
        }
    }

    fn active_duration(&self) -> f64 {
        let paused = self.paused_total + self.paused_since.map(|p| p.elapsed()).unwrap_or_default();
        self.clock.elapsed().saturating_sub(paused).as_secs_f64()
    }

    /// Disarm metering, stop the recorder and release it.
    fn finish(mut self) -> RecordingSummary {
        self.metering = None;
        self.recorder.stop();

        RecordingSummary {
            id: self.id,
            output_target: self.target.clone(),
            codec: self.config.codec,
            started_at: self.started_at,
            duration_secs: self.active_duration(),
        }
    }
}

/// Session slot. A device handle exists exactly in `Recording` and `Paused`.
enum Session<R: Recorder> {
    Idle,
    Recording(ActiveSession<R>),
    Paused(ActiveSession<R>),
    Stopped,
}

impl<R: Recorder> Session<R> {
    fn state(&self) -> CaptureState {
        match self {
            Self::Idle => CaptureState::Idle,
            Self::Recording(_) => CaptureState::Recording,
            Self::Paused(_) => CaptureState::Paused,
            Self::Stopped => CaptureState::Stopped,
        }
    }

    fn active(&self) -> Option<&ActiveSession<R>> {
        match self {
            Self::Recording(active) | Self::Paused(active) => Some(active),
            Self::Idle | Self::Stopped => None,
        }
    }
}

/// Forwards recorder callbacks onto the main context.
struct SessionListener {
    session: Uuid,
    mailbox: Mailbox,
}

impl SessionListener {
    fn post(&self, event: RecorderEvent) {
        let message = Message::Recorder {
            session: self.session,
            event,
        };
        if self.mailbox.post(message).is_err() {
            log::debug!("recorder event for {} dropped: main context closed", self.session);
        }
    }
}

impl RecorderListener for SessionListener {
    fn on_finished(&self, successfully: bool) {
        self.post(RecorderEvent::Finished { successfully });
    }

    fn on_encode_error(&self, error: DeviceError) {
        self.post(RecorderEvent::EncodeError(error));
    }
}

/// Capture session controller.
///
/// Owns at most one recording session, the permission cache and the
/// metering timer. Not thread-safe: drive it from a single thread, normally
/// through [`MainContext`](crate::session::main_context::MainContext).
///
/// ```text
/// [command] → handle_call ─┬→ start / stop / pause / resume → [RecorderBackend]
///                          └→ has_permission → [PermissionNegotiator]
/// [MeteringTimer] → MeterTick → average_power → scale → [CaptureDelegate]
/// ```
pub struct CaptureController<B: RecorderBackend, P: PermissionProvider> {
    backend: B,
    permissions: PermissionNegotiator<P>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    mailbox: Mailbox,
    config: ControllerConfig,
    session: Session<B::Recorder>,
    next_generation: u64,
}

impl<B: RecorderBackend, P: PermissionProvider> CaptureController<B, P> {
    pub fn new(
        backend: B,
        permissions: P,
        mailbox: Mailbox,
        config: ControllerConfig,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidConfiguration)?;

        Ok(Self {
            backend,
            permissions: PermissionNegotiator::new(permissions),
            delegate: None,
            mailbox,
            config,
            session: Session::Idle,
            next_generation: 0,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> CaptureState {
        self.session.state()
    }

    pub fn is_paused(&self) -> bool {
        self.state().is_paused()
    }

    /// True while a session exists, including while it is paused.
    pub fn is_recording(&self) -> bool {
        self.state().is_active()
    }

    /// Whether a metering timer is currently armed.
    pub fn is_metering(&self) -> bool {
        matches!(&self.session, Session::Recording(active) if active.metering.is_some())
    }

    /// Output target of the active session.
    pub fn output_target(&self) -> Option<&OutputTarget> {
        self.session.active().map(|active| &active.target)
    }

    /// Tear down any previous session, then create and start a new one.
    ///
    /// On failure no session is retained and the backend error is logged;
    /// the caller only sees [`CaptureError::StartFailed`].
    pub fn start(&mut self, request: &StartRequest) -> Result<(), CaptureError> {
        self.teardown("restart");

        let target = request.output_target();
        let config = request.recording_config();
        let id = Uuid::new_v4();

        let recorder = self.open_recorder(id, &target, &config).map_err(|e| {
            log::error!("failed to start recording to '{}': {}", target, e);
            CaptureError::StartFailed
        })?;

        log::info!(
            "recording {} started: target='{}' codec={:?} bit_rate={} sample_rate={}",
            id,
            target,
            config.codec,
            config.bit_rate,
            config.sample_rate
        );

        let mut active = ActiveSession::new(id, target, config, recorder);
        active.metering = self.arm_metering();
        self.session = Session::Recording(active);
        self.notify_state();
        Ok(())
    }

    /// Stop and release the active session. Always succeeds.
    pub fn stop(&mut self) {
        self.teardown("stop");
    }

    /// Disarm metering and pause the recorder. No-op without a session.
    pub fn pause(&mut self) {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Recording(mut active) => {
                active.metering = None;
                active.recorder.pause();
                active.mark_paused();
                log::info!("recording {} paused", active.id);
                self.session = Session::Paused(active);
                self.notify_state();
            }
            Session::Paused(mut active) => {
                active.recorder.pause();
                self.session = Session::Paused(active);
            }
            other => {
                log::debug!("pause ignored: no active session");
                self.session = other;
            }
        }
    }

    /// Resume a paused session and re-arm metering.
    ///
    /// Resuming a session that is already recording still replaces its
    /// metering timer. A recorder that refuses to restart is only logged.
    pub fn resume(&mut self) {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Paused(mut active) => {
                if let Err(e) = active.recorder.record() {
                    log::warn!("recording {} did not restart on resume: {}", active.id, e);
                }
                active.mark_resumed();
                active.metering = self.arm_metering();
                log::info!("recording {} resumed", active.id);
                self.session = Session::Recording(active);
                self.notify_state();
            }
            Session::Recording(mut active) => {
                log::debug!("resume while recording {}: re-arming metering", active.id);
                active.metering = None;
                active.metering = self.arm_metering();
                self.session = Session::Recording(active);
            }
            other => {
                log::debug!("resume ignored: no active session");
                self.session = other;
            }
        }
    }

    /// Cached microphone permission. May trigger a prompt whose answer only
    /// affects later calls.
    pub fn has_permission(&mut self) -> bool {
        self.permissions.check(&self.mailbox)
    }

    /// Tear down on a host lifecycle signal, whatever the current state.
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        log::info!("lifecycle signal {:?}", event);
        let reason = match event {
            LifecycleEvent::DidEnterBackground => "entered background",
            LifecycleEvent::WillTerminate => "terminating",
        };
        self.teardown(reason);
    }

    /// Release everything before the controller goes away.
    pub fn shutdown(&mut self) {
        self.teardown("shutdown");
    }

    /// Decode and execute one command, producing its reply.
    pub fn handle_call(&mut self, call: &MethodCall) -> Reply {
        match Command::parse(call) {
            Command::Start(request) => match self.start(&request) {
                Ok(()) => Reply::null(),
                Err(e) => Reply::from(&e),
            },
            Command::Stop => {
                self.stop();
                Reply::null()
            }
            Command::Pause => {
                self.pause();
                Reply::null()
            }
            Command::Resume => {
                self.resume();
                Reply::null()
            }
            Command::IsPaused => Reply::bool(self.is_paused()),
            Command::IsRecording => Reply::bool(self.is_recording()),
            Command::HasPermission => Reply::bool(self.has_permission()),
            Command::Unknown(method) => {
                log::warn!("unhandled method '{}'", method);
                Reply::from(&CaptureError::NotImplemented(method))
            }
        }
    }

    /// Apply one main context message. Breaks on [`Message::Shutdown`].
    pub fn handle_message(&mut self, message: Message) -> ControlFlow<()> {
        match message {
            Message::Call { call, reply } => {
                let response = self.handle_call(&call);
                if reply.send(response).is_err() {
                    log::debug!("caller of '{}' stopped waiting for the reply", call.method);
                }
            }
            Message::Lifecycle(event) => self.handle_lifecycle(event),
            Message::MeterTick { generation } => self.on_meter_tick(generation),
            Message::PermissionResolved { granted } => self.permissions.resolve(granted),
            Message::Recorder { session, event } => self.on_recorder_event(session, event),
            Message::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    // --- Internal helpers ---

    fn open_recorder(
        &mut self,
        id: Uuid,
        target: &OutputTarget,
        config: &RecordingConfig,
    ) -> Result<B::Recorder, DeviceError> {
        config.validate().map_err(DeviceError::RecorderCreation)?;

        self.backend.configure_session(&self.config.audio_session)?;
        self.backend.set_session_active(true)?;

        let result = self.create_and_record(id, target, config);
        if result.is_err() {
            if let Err(e) = self.backend.set_session_active(false) {
                log::warn!("failed to deactivate audio session: {}", e);
            }
        }
        result
    }

    fn create_and_record(
        &mut self,
        id: Uuid,
        target: &OutputTarget,
        config: &RecordingConfig,
    ) -> Result<B::Recorder, DeviceError> {
        let listener = Arc::new(SessionListener {
            session: id,
            mailbox: self.mailbox.clone(),
        });
        let mut recorder = self.backend.create_recorder(target, config, listener)?;
        recorder.set_metering_enabled(true);
        if let Err(e) = recorder.record() {
            recorder.stop();
            return Err(e);
        }
        Ok(recorder)
    }

    fn arm_metering(&mut self) -> Option<MeteringTimer> {
        self.next_generation += 1;
        match MeteringTimer::arm(
            self.config.metering_interval(),
            self.next_generation,
            self.mailbox.clone(),
        ) {
            Ok(timer) => Some(timer),
            Err(e) => {
                log::error!("metering unavailable: {}", e);
                None
            }
        }
    }

    /// Full teardown shared by stop, restart, lifecycle signals and recorder
    /// failures. Leaves `Idle` untouched.
    fn teardown(&mut self, reason: &str) {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Recording(active) | Session::Paused(active) => {
                let summary = active.finish();
                log::info!(
                    "recording {} stopped ({}) after {:.1}s",
                    summary.id,
                    reason,
                    summary.duration_secs
                );
                self.session = Session::Stopped;
                self.notify_state();
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_finished(&summary);
                }
            }
            other => self.session = other,
        }
    }

    fn on_meter_tick(&mut self, generation: u64) {
        let Session::Recording(active) = &mut self.session else {
            log::debug!("metering tick {} ignored: not recording", generation);
            return;
        };
        if active.metering_generation() != Some(generation) {
            log::debug!("stale metering tick {} ignored", generation);
            return;
        }

        active.recorder.update_meters();
        let raw = active.recorder.average_power(0);
        match metering::scale_power(raw) {
            Some(decibels) => {
                if let Some(ref delegate) = self.delegate {
                    delegate.on_decibel_changed(decibels);
                }
            }
            None => log::debug!("level {} dBFS out of range, tick skipped", raw),
        }
    }

    fn on_recorder_event(&mut self, session: Uuid, event: RecorderEvent) {
        if self.session.active().map(|active| active.id) != Some(session) {
            log::debug!("ignoring {:?} from finished recorder {}", event, session);
            return;
        }

        match event {
            RecorderEvent::Finished { successfully: true } => {
                self.teardown("recorder finished");
            }
            RecorderEvent::Finished { successfully: false } => {
                log::error!("recording {} ended unsuccessfully", session);
                self.teardown("recorder failed");
                self.notify_error(&CaptureError::RecorderFailed(
                    "recording finished unsuccessfully".into(),
                ));
            }
            RecorderEvent::EncodeError(e) => {
                log::error!("recording {} encode error: {}", session, e);
                self.teardown("encode error");
                self.notify_error(&CaptureError::RecorderFailed(e.to_string()));
            }
        }
    }

    fn notify_state(&self) {
        let state = self.session.state();
        log::debug!("state -> {}", state.name());
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }

    fn notify_error(&self, error: &CaptureError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

impl<B: RecorderBackend, P: PermissionProvider> Drop for CaptureController<B, P> {
    fn drop(&mut self) {
        self.teardown("controller dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::models::codec::{AudioCodec, AudioContainer};
    use crate::models::config::{AudioSessionOptions, ResolvedTarget, SessionCategory};
    use crate::models::permission::PermissionStatus;
    use crate::session::main_context::{self, Inbox};
    use crate::simulated::{FailureStage, SimulatedBackend, SimulatedDevice, SimulatedPermissions};
    use approx::assert_relative_eq;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<CaptureState>>,
        decibels: Mutex<Vec<f32>>,
        errors: Mutex<Vec<CaptureError>>,
        finished: Mutex<Vec<RecordingSummary>>,
    }

    impl CaptureDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: CaptureState) {
            self.states.lock().push(state);
        }

        fn on_decibel_changed(&self, decibels: f32) {
            self.decibels.lock().push(decibels);
        }

        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }

        fn on_recording_finished(&self, summary: &RecordingSummary) {
            self.finished.lock().push(summary.clone());
        }
    }

    type TestController = CaptureController<SimulatedBackend, SimulatedPermissions>;

    struct Harness {
        device: SimulatedDevice,
        delegate: Arc<RecordingDelegate>,
        controller: TestController,
        inbox: Inbox,
    }

    fn harness() -> Harness {
        let device = SimulatedDevice::new();
        let (mailbox, inbox) = main_context::channel();
        // Long interval so real ticks do not interfere; tests tick by hand.
        let config = ControllerConfig {
            metering_interval_ms: 60_000,
            ..Default::default()
        };
        let mut controller =
            CaptureController::new(device.backend(), device.permissions(), mailbox, config).unwrap();
        let delegate = Arc::new(RecordingDelegate::default());
        controller.set_delegate(delegate.clone());
        Harness {
            device,
            delegate,
            controller,
            inbox,
        }
    }

    fn current_generation(controller: &TestController) -> u64 {
        match &controller.session {
            Session::Recording(active) => active.metering_generation().unwrap(),
            _ => panic!("not recording"),
        }
    }

    /// Deliver everything queued on the inbox, as the main context would.
    fn pump(h: &mut Harness) {
        while let Some(message) = h.inbox.try_recv() {
            let _ = h.controller.handle_message(message);
        }
    }

    #[test]
    fn start_enters_recording_and_arms_metering() {
        let mut h = harness();
        let request = StartRequest {
            encoder: 3,
            bit_rate: 12_200,
            sampling_rate: 8000.0,
            ..StartRequest::new("/tmp/voice.3gp")
        };
        h.controller.start(&request).unwrap();

        assert_eq!(h.controller.state(), CaptureState::Recording);
        assert!(h.controller.is_recording());
        assert!(!h.controller.is_paused());
        assert!(h.controller.is_metering());
        assert_eq!(h.controller.output_target().unwrap().as_str(), "/tmp/voice.3gp");

        let snapshot = h.device.snapshot();
        assert!(snapshot.session_active);
        assert_eq!(snapshot.session_options, Some(Default::default()));
        assert_eq!(snapshot.record_calls, 1);
        let config = snapshot.last_config.unwrap();
        assert_eq!(config.codec, AudioCodec::AmrNb);
        assert_eq!(config.bit_rate, 12_200);
        assert_eq!(config.sample_rate, 8000.0);
        assert_eq!(config.channels, 2);
        let settings = snapshot.last_settings.unwrap();
        assert_eq!(
            settings.destination,
            ResolvedTarget::File(PathBuf::from("/tmp/voice.3gp"))
        );
        assert_eq!(settings.container, AudioContainer::ThreeGpp);
        assert_eq!(settings.format_id, u32::from_be_bytes(*b"samr"));
        assert_eq!(settings.encoder_id, 3);
        assert_eq!(settings.quality, 0x60);

        assert_eq!(*h.delegate.states.lock(), vec![CaptureState::Recording]);
    }

    #[test]
    fn url_target_and_record_category_reach_backend() {
        let device = SimulatedDevice::new();
        let (mailbox, _inbox) = main_context::channel();
        let config = ControllerConfig {
            metering_interval_ms: 60_000,
            audio_session: AudioSessionOptions {
                category: SessionCategory::Record,
                default_to_speaker: false,
                allow_bluetooth: false,
            },
        };
        let mut controller =
            CaptureController::new(device.backend(), device.permissions(), mailbox, config).unwrap();

        controller
            .start(&StartRequest::new("file:///var/mobile/take.m4a"))
            .unwrap();

        let snapshot = device.snapshot();
        assert_eq!(
            snapshot.session_options.map(|options| options.category),
            Some(SessionCategory::Record)
        );
        let settings = snapshot.last_settings.unwrap();
        assert_eq!(
            settings.destination,
            ResolvedTarget::Url("file:///var/mobile/take.m4a".into())
        );
        assert_eq!(settings.container, AudioContainer::Mpeg4);
        assert_eq!(settings.encoder_id, 0);
    }

    #[test]
    fn start_while_recording_tears_down_previous_session() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/one.m4a")).unwrap();
        let first_generation = current_generation(&h.controller);

        h.controller.start(&StartRequest::new("/tmp/two.m4a")).unwrap();

        let snapshot = h.device.snapshot();
        assert_eq!(snapshot.recorders_created, 2);
        assert_eq!(snapshot.recorders_stopped, 1);
        assert_eq!(snapshot.recorders_released, 1);
        assert_eq!(snapshot.live_recorders, 1);
        assert_ne!(current_generation(&h.controller), first_generation);
        assert_eq!(h.controller.output_target().unwrap().as_str(), "/tmp/two.m4a");

        let finished = h.delegate.finished.lock();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].output_target.as_str(), "/tmp/one.m4a");
        assert_eq!(
            *h.delegate.states.lock(),
            vec![
                CaptureState::Recording,
                CaptureState::Stopped,
                CaptureState::Recording
            ]
        );
    }

    #[test]
    fn failed_start_keeps_no_session() {
        for stage in [
            FailureStage::ConfigureSession,
            FailureStage::ActivateSession,
            FailureStage::CreateRecorder,
            FailureStage::Record,
        ] {
            let mut h = harness();
            h.device.set_failure(Some(stage));

            let result = h.controller.start(&StartRequest::new("/tmp/fail.m4a"));

            assert_eq!(result, Err(CaptureError::StartFailed), "stage {stage:?}");
            assert_eq!(h.controller.state(), CaptureState::Idle);
            assert!(!h.controller.is_metering());
            let snapshot = h.device.snapshot();
            assert!(!snapshot.has_live_recorder(), "stage {stage:?}");
            assert!(!snapshot.session_active, "stage {stage:?}");
        }
    }

    #[test]
    fn empty_path_fails_in_backend() {
        let mut h = harness();
        let reply = h.controller.handle_call(&MethodCall::new("start"));
        assert_eq!(reply, Reply::from(&CaptureError::StartFailed));
        assert_eq!(h.device.snapshot().recorders_created, 0);
    }

    #[test]
    fn failed_restart_leaves_previous_session_stopped() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/one.m4a")).unwrap();
        h.device.set_failure(Some(FailureStage::CreateRecorder));

        assert!(h.controller.start(&StartRequest::new("/tmp/two.m4a")).is_err());
        assert_eq!(h.controller.state(), CaptureState::Stopped);
        assert!(!h.device.snapshot().has_live_recorder());
    }

    #[test]
    fn pause_then_resume() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();

        h.controller.pause();
        assert!(h.controller.is_paused());
        assert!(h.controller.is_recording());
        assert!(!h.controller.is_metering());
        assert_eq!(h.device.snapshot().pause_calls, 1);

        h.controller.resume();
        assert_eq!(h.controller.state(), CaptureState::Recording);
        assert!(!h.controller.is_paused());
        assert!(h.controller.is_metering());
        assert_eq!(h.device.snapshot().record_calls, 2);
    }

    #[test]
    fn resume_goes_back_to_recording_even_if_recorder_refuses() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();
        h.controller.pause();
        h.device.set_failure(Some(FailureStage::Record));

        h.controller.resume();

        assert_eq!(h.controller.state(), CaptureState::Recording);
        assert!(!h.controller.is_paused());
        assert!(h.controller.is_metering());
        assert_eq!(h.device.snapshot().record_calls, 1);
        assert_eq!(
            *h.delegate.states.lock(),
            vec![
                CaptureState::Recording,
                CaptureState::Paused,
                CaptureState::Recording
            ]
        );
    }

    #[test]
    fn resume_without_pause_only_rearms_metering() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();
        let before = current_generation(&h.controller);

        h.controller.resume();

        assert!(!h.controller.is_paused());
        assert_eq!(h.controller.state(), CaptureState::Recording);
        assert_eq!(h.device.snapshot().record_calls, 1);
        assert!(current_generation(&h.controller) > before);
        assert_eq!(h.delegate.states.lock().len(), 1);
    }

    #[test]
    fn pause_and_resume_without_session_are_noops() {
        let mut h = harness();
        h.controller.pause();
        h.controller.resume();
        assert_eq!(h.controller.state(), CaptureState::Idle);
        assert!(!h.controller.is_paused());
        assert!(h.delegate.states.lock().is_empty());
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let mut h = harness();
        let reply = h.controller.handle_call(&MethodCall::new("stop"));
        assert_eq!(reply, Reply::null());
        assert_eq!(h.controller.state(), CaptureState::Idle);
        assert!(h.delegate.finished.lock().is_empty());
    }

    #[test]
    fn stop_releases_device_and_reports_summary() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();
        h.controller.pause();
        h.controller.stop();

        assert_eq!(h.controller.state(), CaptureState::Stopped);
        assert!(!h.controller.is_recording());
        assert!(!h.controller.is_paused());
        assert!(!h.controller.is_metering());
        let snapshot = h.device.snapshot();
        assert_eq!(snapshot.recorders_stopped, 1);
        assert!(!snapshot.has_live_recorder());

        let finished = h.delegate.finished.lock();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].codec, AudioCodec::AacLc);
        assert!(finished[0].duration_secs >= 0.0);
    }

    #[test]
    fn metering_scales_and_skips() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();
        h.device.push_power(&[-10.0, 0.5, 0.0]);
        let generation = current_generation(&h.controller);

        for _ in 0..3 {
            h.controller.on_meter_tick(generation);
        }

        let decibels = h.delegate.decibels.lock();
        assert_eq!(decibels.len(), 2);
        assert_relative_eq!(decibels[0], 100.0);
        assert_relative_eq!(decibels[1], 120.0);
    }

    #[test]
    fn stale_and_paused_ticks_are_ignored() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();
        let old = current_generation(&h.controller);
        h.controller.resume();

        h.controller.on_meter_tick(old);
        assert!(h.delegate.decibels.lock().is_empty());

        let current = current_generation(&h.controller);
        h.controller.pause();
        h.controller.on_meter_tick(current);
        assert!(h.delegate.decibels.lock().is_empty());
        assert_eq!(h.device.snapshot().meter_updates, 0);
    }

    #[test]
    fn permission_first_call_returns_stale_value() {
        let mut h = harness();

        assert_eq!(h.controller.handle_call(&MethodCall::new("hasPermission")), Reply::bool(false));
        assert_eq!(h.controller.handle_call(&MethodCall::new("hasPermission")), Reply::bool(false));
        assert_eq!(h.device.snapshot().permission_requests, 1);

        h.device.answer_permission_prompts(true);
        pump(&mut h);
        assert!(h.controller.permissions.cached());
        assert!(h.controller.has_permission());
    }

    #[test]
    fn permission_denied_and_granted() {
        let mut h = harness();
        h.device.set_permission(PermissionStatus::Granted);
        assert!(h.controller.has_permission());
        h.device.set_permission(PermissionStatus::Denied);
        assert!(!h.controller.has_permission());
        assert_eq!(h.device.snapshot().permission_requests, 0);
    }

    #[test]
    fn background_signal_tears_down() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();

        h.controller.handle_lifecycle(LifecycleEvent::DidEnterBackground);

        assert_eq!(h.controller.state(), CaptureState::Stopped);
        assert!(!h.controller.is_metering());
        assert!(!h.device.snapshot().has_live_recorder());
    }

    #[test]
    fn terminate_signal_tears_down_paused_session() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();
        h.controller.pause();

        let _ = h.controller.handle_message(Message::Lifecycle(LifecycleEvent::WillTerminate));

        assert_eq!(h.controller.state(), CaptureState::Stopped);
        assert!(!h.controller.is_paused());
        assert_eq!(h.device.snapshot().recorders_stopped, 1);
    }

    #[test]
    fn finished_event_from_stopped_recorder_is_ignored() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();
        h.controller.start(&StartRequest::new("/tmp/b.m4a")).unwrap();

        // The first recorder's "finished" notification is now queued.
        pump(&mut h);

        assert_eq!(h.controller.state(), CaptureState::Recording);
        assert_eq!(h.controller.output_target().unwrap().as_str(), "/tmp/b.m4a");
    }

    #[test]
    fn encode_error_tears_down_and_reports() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();

        h.device.fail_encoding("disk full");
        pump(&mut h);

        assert_eq!(h.controller.state(), CaptureState::Stopped);
        assert!(!h.device.snapshot().has_live_recorder());
        let errors = h.delegate.errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], CaptureError::RecorderFailed(msg) if msg.contains("disk full")));
    }

    #[test]
    fn platform_ending_recording_tears_down() {
        let mut h = harness();
        h.controller.start(&StartRequest::new("/tmp/a.m4a")).unwrap();

        h.device.finish_recording(false);
        pump(&mut h);

        assert_eq!(h.controller.state(), CaptureState::Stopped);
        assert_eq!(h.delegate.errors.lock().len(), 1);
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let mut h = harness();
        let reply = h.controller.handle_call(&MethodCall::new("getAmplitude"));
        assert_eq!(reply, Reply::NotImplemented);
    }

    #[test]
    fn call_message_replies_on_its_channel() {
        let mut h = harness();
        let (reply, response) = std::sync::mpsc::channel();
        let call = MethodCall::with_arguments("start", json!({ "path": "/tmp/a.m4a", "encoder": 2 }));

        let flow = h.controller.handle_message(Message::Call { call, reply });

        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(response.recv().unwrap(), Reply::null());
        assert_eq!(h.device.snapshot().last_config.unwrap().codec, AudioCodec::AacHe);
        assert_eq!(
            h.controller.handle_call(&MethodCall::new("isRecording")),
            Reply::bool(true)
        );
        assert_eq!(
            h.controller.handle_call(&MethodCall::new("isPaused")),
            Reply::bool(false)
        );
    }

    #[test]
    fn shutdown_message_breaks() {
        let mut h = harness();
        assert_eq!(h.controller.handle_message(Message::Shutdown), ControlFlow::Break(()));
    }

    #[test]
    fn zero_metering_interval_is_rejected() {
        let device = SimulatedDevice::new();
        let (mailbox, _inbox) = main_context::channel();
        let config = ControllerConfig {
            metering_interval_ms: 0,
            ..Default::default()
        };
        let result = CaptureController::new(device.backend(), device.permissions(), mailbox, config);
        assert!(matches!(result, Err(CaptureError::InvalidConfiguration(_))));
    }
}
