use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use record_core::{ChannelEvent, LifecycleEvent, MainContext, MethodCall, Reply};

use crate::delegate::LineWriter;
use crate::error::HostError;

/// Reply code for input lines that are not valid messages.
pub const MALFORMED_CODE: &str = "-2";

/// One stdin line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Lifecycle { lifecycle: LifecycleEvent },
    Call(MethodCall),
}

/// One stdout line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    Reply { reply: Reply },
    Event { event: ChannelEvent },
}

/// Pump `input` into the main context until EOF.
///
/// Each call produces exactly one reply line. EOF is reported to the
/// controller as [`LifecycleEvent::WillTerminate`].
pub fn run<R, W>(input: R, context: &MainContext, out: &LineWriter<W>) -> Result<(), HostError>
where
    R: BufRead,
    W: Write + Send,
{
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Incoming>(line) {
            Ok(Incoming::Call(call)) => {
                log::debug!("call {}", call.method);
                let reply = context.call(call);
                out.send(&Outgoing::Reply { reply })?;
            }
            Ok(Incoming::Lifecycle { lifecycle }) => {
                log::info!("lifecycle signal {:?}", lifecycle);
                context.notify_lifecycle(lifecycle)?;
            }
            Err(e) => {
                log::warn!("malformed input line: {}", e);
                let reply = Reply::Error {
                    code: MALFORMED_CODE.to_string(),
                    message: format!("malformed message: {}", e),
                    details: None,
                };
                out.send(&Outgoing::Reply { reply })?;
            }
        }
    }

    log::info!("stdin closed");
    context.notify_lifecycle(LifecycleEvent::WillTerminate)?;
    Ok(())
}
