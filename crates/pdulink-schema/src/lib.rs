//! Typed messages exchanged with the power-distribution unit.
//!
//! The host sends [`Command`]s and the device answers with [`Report`]s.
//! Both travel as proto3 messages so the firmware can grow optional fields
//! without breaking older hosts; [`proto`] holds the wire structs and the
//! typed layer validates what the wire format cannot express (rail ranges,
//! boolean states).

pub mod command;
pub mod error;
pub mod proto;
pub mod report;

pub use command::Command;
pub use error::{Result, SchemaError};
pub use report::{EnvSample, PowerEvent, RailReading, Report};

/// Highest rail index on the board. Rail 0 addresses every rail at once.
pub const MAX_RAIL: u32 = 8;

/// Length of a per-rail telemetry array: the synthetic global channel plus
/// one slot per physical rail.
pub const CHANNELS: usize = MAX_RAIL as usize + 1;

/// Fail with [`SchemaError::InvalidRail`] unless `rail` is in `0..=MAX_RAIL`.
pub fn check_rail(rail: u32) -> Result<u32> {
    if rail > MAX_RAIL {
        return Err(SchemaError::InvalidRail {
            rail,
            max: MAX_RAIL,
        });
    }
    Ok(rail)
}
