/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The stuffed body violates the COBS invariants.
    #[error("corrupt frame: {0}")]
    Corrupt(#[from] Corruption),

    /// More bytes than the configured maximum arrived without a terminator.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended; any buffered partial frame is lost.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the error only concerns the current frame and the next
    /// terminator resynchronises the stream.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, FrameError::Corrupt(_) | FrameError::FrameTooLarge { .. })
    }

    /// True for read timeouts that leave the stream intact.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        )
    }
}

/// Ways a stuffed body can fail to un-stuff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
    /// A body with no code byte; the smallest valid body is `[0x01]`.
    #[error("empty body")]
    Empty,

    /// A `0x00` survived inside the stuffed body.
    #[error("terminator inside body at offset {offset}")]
    UnexpectedTerminator { offset: usize },

    /// A code byte promises more bytes than remain in the body.
    #[error("code byte {code:#04x} at offset {offset} overruns body of {len} bytes")]
    Overrun { offset: usize, code: u8, len: usize },

    /// The decoder refused a body whose block structure looked sound.
    #[error("body of {len} bytes did not un-stuff")]
    Rejected { len: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
