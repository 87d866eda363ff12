use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use pdulink_frame::{FrameConfig, FrameReader, FrameWriter};
use pdulink_schema::{Command, MAX_RAIL};
use pdulink_transport::{SerialLink, SerialStream};
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// An open link to the PDU: a frame reader plus a shared command writer.
///
/// Dropping the connection (or calling [`Connection::close`]) releases both
/// halves of the port.
pub struct Connection<R, W> {
    name: String,
    reader: FrameReader<R>,
    commands: CommandSender<W>,
}

impl Connection<SerialStream, SerialStream> {
    /// Select the port matching `identifier` and open it at `baud` with
    /// default settings otherwise.
    pub fn open(identifier: &str, baud: u32) -> Result<Self> {
        Self::open_with_config(
            identifier,
            &LinkConfig {
                baud,
                ..LinkConfig::default()
            },
        )
    }

    /// Select and open a port with explicit settings.
    ///
    /// The OS handle is cloned so reads and writes proceed independently on
    /// the full-duplex line.
    pub fn open_with_config(identifier: &str, config: &LinkConfig) -> Result<Self> {
        let stream = SerialLink::open_with_timeout(identifier, config.baud, config.read_timeout)?;
        let writer_stream = stream.try_clone()?;
        let name = stream.name().to_string();

        let frame_config = config.frame_config();
        let reader = FrameReader::with_config_serial(stream, frame_config.clone())?;
        let writer = FrameWriter::with_config(writer_stream, frame_config);

        Ok(Self::from_framed(name, reader, writer))
    }
}

impl<R: Read, W: Write> Connection<R, W> {
    /// Wrap an already-open pair of streams, e.g. one end of a socket pair.
    pub fn from_parts(
        name: impl Into<String>,
        reader: R,
        writer: W,
        config: FrameConfig,
    ) -> Self {
        Self::from_framed(
            name.into(),
            FrameReader::with_config(reader, config.clone()),
            FrameWriter::with_config(writer, config),
        )
    }

    fn from_framed(name: String, reader: FrameReader<R>, writer: FrameWriter<W>) -> Self {
        debug!(port = %name, "link connection ready");
        Self {
            name,
            reader,
            commands: CommandSender::new(writer),
        }
    }

    /// Port the connection was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until one complete frame arrives and return its stuffed body.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        Ok(self.reader.read_frame()?)
    }

    /// Stuff and write one frame through the shared writer.
    pub fn write_frame(&self, body: &[u8]) -> Result<()> {
        self.commands.write_frame(body)
    }

    /// A handle for sending commands from any thread.
    pub fn commands(&self) -> CommandSender<W> {
        self.commands.clone()
    }

    /// Separate the read half (for the read loop) from the command writer.
    pub fn split(self) -> (FrameReader<R>, CommandSender<W>) {
        (self.reader, self.commands)
    }

    /// Release the port.
    pub fn close(self) {
        debug!(port = %self.name, "closing link connection");
    }
}

/// Cloneable, thread-safe command writer.
///
/// Each frame is stuffed, written and flushed while the lock is held, so
/// concurrent senders never interleave bytes on the wire.
pub struct CommandSender<W> {
    writer: Arc<Mutex<FrameWriter<W>>>,
}

impl<W> Clone for CommandSender<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W: Write> CommandSender<W> {
    pub fn new(writer: FrameWriter<W>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Switch `rail` on or off.
    ///
    /// An out-of-range rail fails with [`LinkError::InvalidRail`] before any
    /// byte is written. Write failures are reported, not retried.
    pub fn send_command(&self, rail: u32, state: bool) -> Result<Command> {
        let command = Command::new(rail, state).map_err(|_| LinkError::InvalidRail {
            rail,
            max: MAX_RAIL,
        })?;
        self.send(command)?;
        Ok(command)
    }

    /// Write an already-validated command.
    pub fn send(&self, command: Command) -> Result<()> {
        self.write_frame(&command.encode())?;
        debug!(rail = command.rail(), state = command.state(), "sent rail command");
        Ok(())
    }

    /// Stuff and write one raw frame body.
    pub fn write_frame(&self, body: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().map_err(|_| LinkError::WriterPoisoned)?;
        writer.write_frame(body).map_err(LinkError::Write)
    }
}
