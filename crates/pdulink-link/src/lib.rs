//! Host side of the PDU serial link.
//!
//! This is the "just works" layer. Open a port, get a stream of aggregated
//! telemetry snapshots out and send rail commands in:
//!
//! - [`Connection`] owns the port and splits into a read half and a
//!   cloneable, lock-protected [`CommandSender`]
//! - [`Controller`] decodes frames, merges rail readings into a
//!   [`TelemetrySnapshot`] and hands copies to a [`TelemetrySink`]
//! - [`ReadLoop`] drives the controller from the read half until it is
//!   stopped or the channel is lost
//! - [`telemetry_queue`] is the bounded hand-off to a consumer thread
//! - [`LinkSession`] wires all of the above together

pub mod config;
pub mod connection;
pub mod controller;
pub mod error;
pub mod queue;
pub mod read_loop;
pub mod session;
pub mod sink;
pub mod snapshot;

pub use config::LinkConfig;
pub use connection::{CommandSender, Connection};
pub use controller::{Controller, FrameOutcome, LinkStats};
pub use error::{LinkError, Result};
pub use queue::{telemetry_queue, Backpressure, LinkMessage, QueueSink, TelemetryReceiver};
pub use read_loop::{LoopExit, LoopState, ReadLoop, ReadLoopHandle, Step, StopSignal};
pub use session::LinkSession;
pub use sink::TelemetrySink;
pub use snapshot::{Telemetry, TelemetrySnapshot};

pub use pdulink_schema::{Command, EnvSample, PowerEvent, Report, CHANNELS, MAX_RAIL};
