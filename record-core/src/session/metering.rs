use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::models::error::CaptureError;
use crate::session::main_context::{Mailbox, Message};

/// Offset added to the raw dBFS reading before scaling.
pub const DECIBEL_OFFSET: f32 = 60.0;

/// Multiplier applied after the offset.
pub const DECIBEL_SCALE: f32 = 2.0;

/// Convert a raw average power reading into the value emitted to the host.
///
/// Readings above 0 dBFS (and NaN) are backend anomalies and produce no
/// event for that tick.
pub fn scale_power(raw: f32) -> Option<f32> {
    if raw.is_nan() || raw > 0.0 {
        return None;
    }
    Some((raw + DECIBEL_OFFSET) * DECIBEL_SCALE)
}

/// Periodic trigger for level sampling.
///
/// The timer thread only posts [`Message::MeterTick`] into the main context;
/// sampling itself happens there, so ticks never overlap. Dropping the timer
/// wakes and joins the thread immediately. Ticks already queued are
/// recognised as stale by their generation.
pub struct MeteringTimer {
    generation: u64,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MeteringTimer {
    pub fn arm(interval: Duration, generation: u64, mailbox: Mailbox) -> Result<Self, CaptureError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("record-metering".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if mailbox.post(Message::MeterTick { generation }).is_err() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn metering thread: {}", e)))?;

        log::debug!("metering armed (generation {}, every {:?})", generation, interval);

        Ok(Self {
            generation,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for MeteringTimer {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("metering thread panicked");
            }
        }
        log::debug!("metering disarmed (generation {})", self.generation);
    }
}
