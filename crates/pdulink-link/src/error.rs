use pdulink_frame::FrameError;

/// Errors that can occur on the link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Port discovery or open failed. Fatal to the session.
    #[error("connection error: {0}")]
    Transport(#[from] pdulink_transport::TransportError),

    /// Reading or un-stuffing a frame failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A well-delimited frame held a malformed or invalid message.
    #[error("protocol decode error: {0}")]
    Schema(#[from] pdulink_schema::SchemaError),

    /// Caller asked for a rail the board does not have. Nothing was sent.
    #[error("invalid rail {rail} (valid rails are 0..={max})")]
    InvalidRail { rail: u32, max: u32 },

    /// Writing a command failed. The command may or may not have reached
    /// the device and is not retried.
    #[error("command write failed: {0}")]
    Write(#[source] FrameError),

    /// A writer panicked while holding the command lock.
    #[error("command writer poisoned")]
    WriterPoisoned,

    /// The read loop thread could not be started.
    #[error("failed to spawn read loop: {0}")]
    Spawn(#[source] std::io::Error),

    /// The read loop thread panicked.
    #[error("read loop panicked")]
    ReadLoopPanicked,
}

impl LinkError {
    /// True for failures confined to a single frame; the next terminator
    /// resumes normal operation.
    pub fn is_per_frame(&self) -> bool {
        match self {
            LinkError::Frame(err) => err.is_per_frame(),
            LinkError::Schema(_) => true,
            _ => false,
        }
    }

    /// True when the read loop can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        !self.is_channel_lost()
    }

    /// True when the device is gone (EOF or a hard I/O error on the port).
    pub fn is_channel_lost(&self) -> bool {
        match self {
            LinkError::Frame(FrameError::ConnectionClosed) => true,
            LinkError::Frame(err @ FrameError::Io(_)) => !err.is_timeout(),
            LinkError::Transport(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
