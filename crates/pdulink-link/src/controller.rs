use std::io::Write;

use pdulink_frame::FrameError;
use pdulink_schema::{Command, Report};
use serde::Serialize;
use tracing::debug;

use crate::connection::CommandSender;
use crate::error::{LinkError, Result};
use crate::sink::TelemetrySink;
use crate::snapshot::TelemetrySnapshot;

/// What one frame contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameOutcome {
    /// Rail readings merged into the snapshot.
    pub rails: usize,
    /// Environment data was delivered.
    pub env: bool,
    /// A power event was delivered.
    pub event: bool,
}

impl FrameOutcome {
    pub fn is_empty(&self) -> bool {
        self.rails == 0 && !self.env && !self.event
    }
}

/// Running counters for one link session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Frames that decoded into a report.
    pub frames: u64,
    /// `on_telemetry` deliveries.
    pub telemetry: u64,
    /// `on_event` deliveries.
    pub events: u64,
    /// Frames dropped because un-stuffing failed.
    pub corrupt: u64,
    /// Frames dropped for exceeding the size limit.
    pub oversized: u64,
    /// Frames whose protobuf body was malformed or out of range.
    pub malformed: u64,
    /// Reports carrying nothing.
    pub empty: u64,
}

impl LinkStats {
    /// Frames that never reached the sink.
    pub fn dropped(&self) -> u64 {
        self.corrupt + self.oversized + self.malformed
    }
}

/// Turns device frames into snapshot updates and sink calls, and sends
/// rail commands.
///
/// Owns the running [`TelemetrySnapshot`]; the sink only ever sees copies.
pub struct Controller<S, W> {
    snapshot: TelemetrySnapshot,
    sink: S,
    commands: CommandSender<W>,
    stats: LinkStats,
}

impl<S: TelemetrySink, W: Write> Controller<S, W> {
    pub fn new(sink: S, commands: CommandSender<W>) -> Self {
        Self {
            snapshot: TelemetrySnapshot::new(),
            sink,
            commands,
            stats: LinkStats::default(),
        }
    }

    /// Switch `rail` on or off. See [`CommandSender::send_command`].
    pub fn send_command(&self, rail: u32, state: bool) -> Result<Command> {
        self.commands.send_command(rail, state)
    }

    /// A command handle that outlives borrows of the controller.
    pub fn commands(&self) -> CommandSender<W> {
        self.commands.clone()
    }

    /// Handle one stuffed frame body: un-stuff, decode, dispatch.
    ///
    /// A failure leaves the snapshot untouched and is counted in
    /// [`LinkStats`].
    pub fn on_frame(&mut self, raw: &[u8]) -> Result<FrameOutcome> {
        let report = self.decode(raw)?;
        Ok(self.dispatch(report))
    }

    /// Un-stuff and decode one frame without touching the snapshot.
    pub fn decode(&mut self, raw: &[u8]) -> Result<Report> {
        let body = pdulink_frame::decode(raw).map_err(|err| {
            self.record_dropped_frame(&err);
            LinkError::Frame(err)
        })?;
        let report = Report::decode(&body).map_err(|err| {
            self.stats.malformed += 1;
            LinkError::Schema(err)
        })?;
        self.stats.frames += 1;
        Ok(report)
    }

    /// Apply a decoded report and notify the sink.
    pub fn dispatch(&mut self, report: Report) -> FrameOutcome {
        let outcome = FrameOutcome {
            rails: report.rails.len(),
            env: report.env.is_some(),
            event: report.event.is_some(),
        };

        if report.has_rails() {
            self.snapshot.merge(&report.rails);
        }
        if report.has_rails() || report.env.is_some() {
            self.sink.on_telemetry(self.snapshot.to_telemetry(report.env));
            self.stats.telemetry += 1;
        }
        if let Some(event) = report.event {
            debug!(rail = event.rail, diagnostic = %event.diagnostic, "power event");
            self.sink.on_event(event);
            self.stats.events += 1;
        }
        if outcome.is_empty() {
            self.stats.empty += 1;
        }

        debug!(
            rails = outcome.rails,
            env = outcome.env,
            event = outcome.event,
            "dispatched report"
        );
        outcome
    }

    /// Count a frame the reader had to drop before it reached `on_frame`.
    pub fn record_dropped_frame(&mut self, err: &FrameError) {
        match err {
            FrameError::Corrupt(_) => self.stats.corrupt += 1,
            FrameError::FrameTooLarge { .. } => self.stats.oversized += 1,
            FrameError::Io(_) | FrameError::ConnectionClosed => {}
        }
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Forget every rail reading and counter.
    pub fn reset(&mut self) {
        self.snapshot = TelemetrySnapshot::new();
        self.stats = LinkStats::default();
    }
}
