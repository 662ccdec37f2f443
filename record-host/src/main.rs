use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use record_core::{CaptureDelegate, MainContext, SimulatedDevice};
use record_host::{ChannelDelegate, HostConfig, HostError, LineWriter};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match serve() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve() -> Result<(), HostError> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => HostConfig::load(&path)?,
        None => HostConfig::default(),
    };

    let device = SimulatedDevice::new();
    device.set_auto_answer(config.permission_answer);

    let out = LineWriter::new(io::stdout());
    let delegate: Arc<dyn CaptureDelegate> = ChannelDelegate::new(Arc::clone(&out));
    let context = MainContext::launch(
        device.backend(),
        device.permissions(),
        Some(delegate),
        config.controller,
    )?;

    log::info!("record-host ready");
    let result = record_host::run(io::stdin().lock(), &context, &out);
    context.shutdown();
    result
}
