use bytes::Bytes;
use prost::Message;
use serde::Serialize;

use crate::error::{Result, SchemaError};
use crate::proto::{PowerControl, RxMicro};

/// Switch one rail (or all of them, rail 0) on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Command {
    rail: u32,
    state: bool,
}

impl Command {
    /// Build a command, rejecting rails outside `0..=MAX_RAIL`.
    pub fn new(rail: u32, state: bool) -> Result<Self> {
        crate::check_rail(rail)?;
        Ok(Self { rail, state })
    }

    pub fn rail(&self) -> u32 {
        self.rail
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// Protobuf encoding of the command (no framing).
    pub fn encode(&self) -> Vec<u8> {
        self.to_proto().encode_to_vec()
    }

    /// Complete wire frame: stuffed body plus terminator.
    pub fn to_wire(&self) -> Bytes {
        pdulink_frame::encode(&self.encode())
    }

    /// Decode a protobuf command body, as the firmware would.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let msg = RxMicro::decode(body)?;
        let control = msg.power_control.ok_or(SchemaError::MissingControl)?;
        let state = match control.power_state {
            0 => false,
            1 => true,
            other => return Err(SchemaError::InvalidState(other)),
        };
        Self::new(control.power_rail, state)
    }

    fn to_proto(self) -> RxMicro {
        RxMicro {
            power_control: Some(PowerControl {
                power_rail: self.rail,
                power_state: u32::from(self.state),
            }),
        }
    }
}
