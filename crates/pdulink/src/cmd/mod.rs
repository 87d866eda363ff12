use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use pdulink_link::{Backpressure, LinkConfig};
use pdulink_transport::DEFAULT_BAUD;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod monitor;
pub mod ports;
pub mod rail;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports.
    Ports(PortsArgs),
    /// Stream telemetry and power events from the PDU.
    Monitor(MonitorArgs),
    /// Switch a rail on or off.
    Rail(RailArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Rail(args) => rail::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Port selection and line settings shared by every command that talks to
/// the board.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Device path, or a pattern matched against port name, product,
    /// manufacturer and serial number.
    #[arg(long, short = 'p', env = "PDULINK_PORT", default_value = "USB")]
    pub port: String,
    /// Baud rate.
    #[arg(long, env = "PDULINK_BAUD", default_value_t = DEFAULT_BAUD)]
    pub baud: u32,
    /// Serial read timeout (e.g. 100ms, 1s). Bounds Ctrl-C latency.
    #[arg(long, default_value = "100ms")]
    pub read_timeout: String,
}

impl LinkArgs {
    pub fn to_config(&self) -> CliResult<LinkConfig> {
        Ok(LinkConfig {
            baud: self.baud,
            read_timeout: parse_duration(&self.read_timeout)?,
            ..LinkConfig::default()
        })
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {
    /// Only list ports matching this pattern.
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Telemetry queue depth between the reader and the printer.
    #[arg(long, default_value_t = 256)]
    pub queue_capacity: usize,
    /// What to do when the queue is full: block, drop-oldest or drop-newest.
    #[arg(long, default_value = "drop-oldest")]
    pub backpressure: Backpressure,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RailState {
    On,
    Off,
}

impl RailState {
    pub fn is_on(self) -> bool {
        self == RailState::On
    }
}

#[derive(Args, Debug)]
pub struct RailArgs {
    /// Rail number, 1-8, or 0 for every rail.
    pub rail: u32,
    /// Desired state.
    pub state: RailState,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, true)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
