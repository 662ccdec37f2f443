use std::ops::ControlFlow;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::channel::method_call::{MethodCall, Reply};
use crate::models::config::ControllerConfig;
use crate::models::error::{CaptureError, DeviceError};
use crate::models::lifecycle::LifecycleEvent;
use crate::session::controller::CaptureController;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::permission_provider::PermissionProvider;
use crate::traits::recorder_backend::RecorderBackend;

/// Asynchronous notification from a recorder, tagged with its session.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    Finished { successfully: bool },
    EncodeError(DeviceError),
}

/// Work item for the main context. Every controller mutation arrives as one.
#[derive(Debug)]
pub enum Message {
    /// A command from the channel and where to send its reply.
    Call {
        call: MethodCall,
        reply: mpsc::Sender<Reply>,
    },
    Lifecycle(LifecycleEvent),
    /// Metering timer fired. `generation` identifies the timer that fired.
    MeterTick { generation: u64 },
    PermissionResolved { granted: bool },
    Recorder {
        session: uuid::Uuid,
        event: RecorderEvent,
    },
    Shutdown,
}

/// Sending side of the main context queue.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

/// Receiving side of the main context queue.
pub struct Inbox {
    receiver: mpsc::Receiver<Message>,
}

/// Create a connected mailbox/inbox pair.
pub fn channel() -> (Mailbox, Inbox) {
    let (sender, receiver) = mpsc::channel();
    (Mailbox { sender }, Inbox { receiver })
}

impl Mailbox {
    pub fn post(&self, message: Message) -> Result<(), CaptureError> {
        self.sender
            .send(message)
            .map_err(|_| CaptureError::ContextClosed)
    }
}

impl Inbox {
    /// Block until a message arrives. `None` once every mailbox is gone.
    pub fn recv(&self) -> Option<Message> {
        self.receiver.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// Serialized executor owning a [`CaptureController`].
///
/// Runs on a dedicated `record-main` thread. Commands, metering ticks,
/// permission answers, recorder events and lifecycle signals are all queued
/// through one [`Mailbox`] and handled strictly in arrival order, so the
/// controller never needs a lock.
///
/// Do not call [`MainContext::call`] from inside a [`CaptureDelegate`]: the
/// delegate runs on the main context and would wait on itself.
pub struct MainContext {
    mailbox: Mailbox,
    handle: Option<thread::JoinHandle<()>>,
}

impl MainContext {
    /// Build a controller around `backend` and `permissions` and start it.
    pub fn launch<B, P>(
        backend: B,
        permissions: P,
        delegate: Option<Arc<dyn CaptureDelegate>>,
        config: ControllerConfig,
    ) -> Result<Self, CaptureError>
    where
        B: RecorderBackend + 'static,
        P: PermissionProvider + 'static,
    {
        let (mailbox, inbox) = channel();
        let mut controller = CaptureController::new(backend, permissions, mailbox, config)?;
        if let Some(delegate) = delegate {
            controller.set_delegate(delegate);
        }
        Self::spawn(controller, inbox)
    }

    /// `inbox` must be the receiving side of the controller's mailbox.
    fn spawn<B, P>(controller: CaptureController<B, P>, inbox: Inbox) -> Result<Self, CaptureError>
    where
        B: RecorderBackend + 'static,
        P: PermissionProvider + 'static,
    {
        let mailbox = controller.mailbox().clone();

        let handle = thread::Builder::new()
            .name("record-main".into())
            .spawn(move || run(controller, inbox))
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn main context: {}", e)))?;

        Ok(Self {
            mailbox,
            handle: Some(handle),
        })
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Send a command and wait for its reply.
    pub fn call(&self, call: MethodCall) -> Reply {
        let (reply, response) = mpsc::channel();
        if self.mailbox.post(Message::Call { call, reply }).is_err() {
            return Reply::from(&CaptureError::ContextClosed);
        }
        response
            .recv()
            .unwrap_or_else(|_| Reply::from(&CaptureError::ContextClosed))
    }

    /// Forward a host lifecycle signal. Does not wait for the teardown.
    pub fn notify_lifecycle(&self, event: LifecycleEvent) -> Result<(), CaptureError> {
        self.mailbox.post(Message::Lifecycle(event))
    }

    /// Tear down any active session and stop the main context thread.
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.mailbox.post(Message::Shutdown).is_err() {
            log::warn!("main context already gone at shutdown");
        }
        if handle.join().is_err() {
            log::error!("main context thread panicked");
        }
    }
}

impl Drop for MainContext {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

fn run<B, P>(mut controller: CaptureController<B, P>, inbox: Inbox)
where
    B: RecorderBackend,
    P: PermissionProvider,
{
    log::debug!("main context started");
    while let Some(message) = inbox.recv() {
        if let ControlFlow::Break(()) = controller.handle_message(message) {
            break;
        }
    }
    controller.shutdown();
    log::debug!("main context stopped");
}
