//! Serial transport for the PDU link.
//!
//! Provides the lowest layer of pdulink:
//! - enumeration of the serial interfaces present on the host
//! - selection of one interface by name/pattern, failing loudly on no match
//! - [`SerialStream`], a `Read + Write` handle that can be cloned so the
//!   read and write directions of a full-duplex port run independently
//!
//! Everything else builds on top of the [`SerialStream`] type provided here.

pub mod error;
pub mod port;
pub mod stream;

pub use error::{Result, TransportError};
pub use port::{available_ports, select_from, select_port, PortInfo, PortKind, SerialLink};
pub use stream::SerialStream;

/// Default line rate of the PDU firmware.
pub const DEFAULT_BAUD: u32 = 115_200;
