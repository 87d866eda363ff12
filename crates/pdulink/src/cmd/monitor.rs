use std::time::Duration;

use pdulink_link::{LinkSession, LoopExit, StopSignal};

use crate::cmd::MonitorArgs;
use crate::exit::{link_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let config = pdulink_link::LinkConfig {
        queue_capacity: args.queue_capacity,
        backpressure: args.backpressure,
        ..args.link.to_config()?
    };

    let session = LinkSession::open(&args.link.port, &config)
        .map_err(|err| link_error("open failed", err))?;
    install_ctrlc_handler(session.stop_signal())?;

    let mut printed = 0usize;
    loop {
        match session.telemetry().recv_timeout(POLL_INTERVAL) {
            Some(message) => {
                print_message(&message, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            None if session.telemetry().is_disconnected() => break,
            None => {}
        }
    }

    let dropped = session.telemetry().dropped();
    if dropped > 0 {
        tracing::warn!(dropped, "telemetry dropped by backpressure policy");
    }

    match session.stop().map_err(|err| link_error("read loop failed", err))? {
        LoopExit::Cancelled => Ok(SUCCESS),
        LoopExit::ChannelLost(err) => Err(link_error("link lost", err)),
    }
}

fn install_ctrlc_handler(stop: StopSignal) -> CliResult<()> {
    ctrlc::set_handler(move || stop.stop())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
