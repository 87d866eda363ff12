//! Host-side link to the RockSat power-distribution unit.
//!
//! The PDU streams per-rail voltage and current readings over a serial line
//! and accepts rail on/off commands. Frames are COBS-stuffed protobuf
//! messages delimited by `0x00`.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port discovery and opening
//! - [`frame`]: COBS framing over any `Read`/`Write` stream
//! - [`schema`]: typed commands and reports on top of the protobuf schema
//! - [`link`]: connection, telemetry aggregation, read loop and queue
//!   (behind the `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use pdulink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pdulink_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use pdulink_schema::*;
}

/// Re-export link types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use pdulink_link::*;
}
