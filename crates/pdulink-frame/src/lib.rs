//! Zero-delimited, COBS byte-stuffed message framing for serial links.
//!
//! Every message on the wire is:
//! - the payload, transformed with Consistent Overhead Byte Stuffing so that
//!   it contains no `0x00` byte
//! - a single `0x00` terminator
//!
//! A receiver that joins mid-stream, or loses bytes to line noise, resyncs
//! on the next terminator. No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    decode, encode, encode_frame, max_encoded_len, FrameConfig, DEFAULT_MAX_FRAME_SIZE, TERMINATOR,
};
pub use error::{Corruption, FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::CobsCodec;
