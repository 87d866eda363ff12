/// Errors that can occur while building or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The payload is not a valid protobuf encoding of the expected message.
    #[error("malformed message: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A rail index outside the board's range.
    #[error("rail {rail} out of range (0..={max})")]
    InvalidRail { rail: u32, max: u32 },

    /// A telemetry entry addressed the synthetic global channel.
    #[error("rail {0} cannot carry telemetry (valid rails are 1..={max})", max = crate::MAX_RAIL)]
    ReservedRail(u32),

    /// A power state other than 0 (off) or 1 (on).
    #[error("power state {0} is neither 0 nor 1")]
    InvalidState(u32),

    /// A command arrived without its power-control body.
    #[error("command has no powerControl field")]
    MissingControl,
}

pub type Result<T> = std::result::Result<T, SchemaError>;
