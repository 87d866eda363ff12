use std::io::{Read, Write};

use pdulink_schema::Command;
use pdulink_transport::SerialStream;
use tracing::info;

use crate::config::LinkConfig;
use crate::connection::{CommandSender, Connection};
use crate::controller::Controller;
use crate::error::Result;
use crate::queue::{telemetry_queue, TelemetryReceiver};
use crate::read_loop::{LoopExit, ReadLoop, ReadLoopHandle, StopSignal};

/// A running link: read loop thread, telemetry queue and command handle.
pub struct LinkSession<W> {
    commands: CommandSender<W>,
    telemetry: TelemetryReceiver,
    read_loop: ReadLoopHandle,
}

impl LinkSession<SerialStream> {
    /// Open the port matching `identifier` and start reading from it.
    pub fn open(identifier: &str, config: &LinkConfig) -> Result<Self> {
        let connection = Connection::open_with_config(identifier, config)?;
        Self::start(connection, config)
    }
}

impl<W: Write + Send + 'static> LinkSession<W> {
    /// Start a read loop over `connection`, delivering into a queue sized
    /// and policed by `config`.
    pub fn start<R>(connection: Connection<R, W>, config: &LinkConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let port = connection.name().to_string();
        let (reader, commands) = connection.split();
        let (sink, telemetry) = telemetry_queue(config.queue_capacity, config.backpressure);

        let controller = Controller::new(sink, commands.clone());
        let read_loop = ReadLoopHandle::spawn(ReadLoop::new(reader, controller))?;

        info!(
            port = %port,
            queue_capacity = config.queue_capacity,
            backpressure = %config.backpressure,
            "link session started"
        );
        Ok(Self {
            commands,
            telemetry,
            read_loop,
        })
    }

    /// Switch `rail` on or off.
    pub fn send_command(&self, rail: u32, state: bool) -> Result<Command> {
        self.commands.send_command(rail, state)
    }

    pub fn commands(&self) -> CommandSender<W> {
        self.commands.clone()
    }

    /// Consumer side of the telemetry queue.
    pub fn telemetry(&self) -> &TelemetryReceiver {
        &self.telemetry
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.read_loop.stop_signal()
    }

    /// False once the read loop has exited (stopped or channel lost).
    pub fn is_running(&self) -> bool {
        !self.read_loop.is_finished()
    }

    /// Stop the read loop and wait for it to release the port.
    ///
    /// The queue is closed first so a loop blocked on a full queue under
    /// [`crate::Backpressure::Block`] can observe the stop request.
    pub fn stop(self) -> Result<LoopExit> {
        self.telemetry.close();
        self.read_loop.stop_and_join()
    }

    /// Wait for the read loop to exit on its own.
    pub fn wait(self) -> Result<LoopExit> {
        self.read_loop.join()
    }
}
