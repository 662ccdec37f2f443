use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use record_core::{CaptureDelegate, CaptureError, CaptureState, ChannelEvent, RecordingSummary};

use crate::bridge::Outgoing;
use crate::error::HostError;

/// Line-oriented writer shared by replies and events.
pub struct LineWriter<W: Write + Send> {
    inner: Mutex<W>,
}

impl<W: Write + Send> LineWriter<W> {
    pub fn new(inner: W) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Serialize `message` as one JSON line and flush.
    pub fn send(&self, message: &Outgoing) -> Result<(), HostError> {
        let line = serde_json::to_string(message)?;
        let mut out = self.inner.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

/// CaptureDelegate that forwards controller notifications as channel events.
pub struct ChannelDelegate<W: Write + Send> {
    out: Arc<LineWriter<W>>,
}

impl<W: Write + Send> ChannelDelegate<W> {
    pub fn new(out: Arc<LineWriter<W>>) -> Arc<Self> {
        Arc::new(Self { out })
    }

    fn emit(&self, method: &str, arguments: Value) {
        let event = Outgoing::Event {
            event: ChannelEvent::new(method, arguments),
        };
        if let Err(e) = self.out.send(&event) {
            log::warn!("failed to emit {}: {}", method, e);
        }
    }
}

impl<W: Write + Send> CaptureDelegate for ChannelDelegate<W> {
    fn on_state_changed(&self, state: CaptureState) {
        self.emit(ChannelEvent::STATE_CHANGE, json!(state.name()));
    }

    fn on_decibel_changed(&self, decibels: f32) {
        self.emit(ChannelEvent::DECIBEL_CHANGE, json!(f64::from(decibels)));
    }

    fn on_error(&self, error: &CaptureError) {
        self.emit(
            ChannelEvent::ERROR,
            json!({ "code": error.code(), "message": error.to_string() }),
        );
    }

    fn on_recording_finished(&self, summary: &RecordingSummary) {
        let payload = serde_json::to_value(summary).unwrap_or(Value::Null);
        self.emit(ChannelEvent::RECORDING_FINISHED, payload);
    }
}
