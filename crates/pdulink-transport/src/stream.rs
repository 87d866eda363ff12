use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::{Result, TransportError};

/// An open serial port. Implements `Read` and `Write`.
///
/// This is the fundamental I/O type returned by [`crate::SerialLink::open`].
/// Reads honour the configured timeout and surface `ErrorKind::TimedOut`
/// when no byte arrived in time, which lets callers poll a stop flag.
pub struct SerialStream {
    inner: Box<dyn SerialPort>,
    name: String,
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl SerialStream {
    pub(crate) fn from_port(inner: Box<dyn SerialPort>, name: String) -> Self {
        Self { inner, name }
    }

    /// The device path this stream was opened from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the read timeout on the underlying port.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.inner
            .set_timeout(timeout)
            .map_err(|source| TransportError::Configure {
                port: self.name.clone(),
                source,
            })
    }

    /// Current read timeout of the underlying port.
    pub fn read_timeout(&self) -> Duration {
        self.inner.timeout()
    }

    /// Configured line rate, if the driver reports one.
    pub fn baud_rate(&self) -> Option<u32> {
        self.inner.baud_rate().ok()
    }

    /// Try to clone this stream (duplicates the OS handle).
    ///
    /// The clone shares the device but not the user-space buffering, so one
    /// handle can block in `read` while the other writes.
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self
            .inner
            .try_clone()
            .map_err(|source| TransportError::Configure {
                port: self.name.clone(),
                source,
            })?;
        Ok(Self::from_port(cloned, self.name.clone()))
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("name", &self.name)
            .finish()
    }
}
