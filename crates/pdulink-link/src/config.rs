use std::time::Duration;

use pdulink_frame::{FrameConfig, DEFAULT_MAX_FRAME_SIZE};
use pdulink_transport::DEFAULT_BAUD;
use serde::Serialize;

use crate::queue::Backpressure;

/// Default serial read timeout. Bounds how long a stop request can go unnoticed.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Default telemetry queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Settings for one link session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkConfig {
    /// Serial baud rate. Default: 115200.
    pub baud: u32,
    /// Port read timeout; each expiry is an idle tick of the read loop.
    pub read_timeout: Duration,
    /// Maximum stuffed frame size in either direction.
    pub max_frame_size: usize,
    /// Telemetry queue depth.
    pub queue_capacity: usize,
    /// Behaviour of a full telemetry queue.
    pub backpressure: Backpressure,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            backpressure: Backpressure::default(),
        }
    }
}

impl LinkConfig {
    /// Frame settings shared by the reader and writer halves.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_frame_size: self.max_frame_size,
            read_timeout: Some(self.read_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_board() {
        let config = LinkConfig::default();
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.backpressure, Backpressure::DropOldest);
    }

    #[test]
    fn frame_config_carries_timeout_and_limit() {
        let config = LinkConfig {
            read_timeout: Duration::from_millis(20),
            max_frame_size: 64,
            ..LinkConfig::default()
        };
        let frame = config.frame_config();
        assert_eq!(frame.max_frame_size, 64);
        assert_eq!(frame.read_timeout, Some(Duration::from_millis(20)));
    }

    #[test]
    fn serializes_for_diagnostics() {
        let json = serde_json::to_value(LinkConfig::default()).unwrap();
        assert_eq!(json["baud"], 115_200);
        assert_eq!(json["backpressure"], "drop-oldest");
    }
}
