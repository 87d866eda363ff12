use prost::Message;
use serde::Serialize;

use crate::error::{Result, SchemaError};
use crate::proto::{self, TxMicro};
use crate::MAX_RAIL;

/// One rail's electrical readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RailReading {
    pub rail: u32,
    /// Volts.
    pub voltage: f32,
    /// Amperes.
    pub current: f32,
}

/// Board temperature (°C) and relative humidity (%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvSample {
    pub temperature: f32,
    pub humidity: f32,
}

/// A diagnostic raised by the firmware, e.g. an over-current trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerEvent {
    pub rail: u32,
    pub diagnostic: String,
}

/// Everything one device frame carried. Any combination of parts may be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub rails: Vec<RailReading>,
    pub env: Option<EnvSample>,
    pub event: Option<PowerEvent>,
}

impl Report {
    /// Decode and validate a protobuf report body.
    ///
    /// Telemetry for rail 0 or beyond [`MAX_RAIL`] rejects the whole report.
    /// An event keeps whatever rail the firmware reported.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let msg = TxMicro::decode(body)?;

        let rails = msg
            .power_rail_info
            .into_iter()
            .map(|info| {
                if info.power_rail == 0 {
                    return Err(SchemaError::ReservedRail(0));
                }
                crate::check_rail(info.power_rail)?;
                Ok(RailReading {
                    rail: info.power_rail,
                    voltage: info.voltage,
                    current: info.current,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let event = msg.power_event.map(|event| PowerEvent {
            rail: event.power_rail,
            diagnostic: event.diagnostic,
        });

        Ok(Self {
            rails,
            env: msg.env_event.map(|env| EnvSample {
                temperature: env.temp,
                humidity: env.humidity,
            }),
            event,
        })
    }

    /// Protobuf encoding, as the firmware emits it. Used by simulators and tests.
    pub fn encode(&self) -> Vec<u8> {
        TxMicro {
            power_rail_info: self
                .rails
                .iter()
                .map(|r| proto::PowerRailInfo {
                    power_rail: r.rail,
                    voltage: r.voltage,
                    current: r.current,
                })
                .collect(),
            env_event: self.env.map(|env| proto::EnvEvent {
                temp: env.temperature,
                humidity: env.humidity,
            }),
            power_event: self.event.as_ref().map(|event| proto::PowerEvent {
                power_rail: event.rail,
                diagnostic: event.diagnostic.clone(),
            }),
        }
        .encode_to_vec()
    }

    pub fn has_rails(&self) -> bool {
        !self.rails.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.rails.is_empty() && self.env.is_none() && self.event.is_none()
    }

    /// Convenience builder for a rail reading.
    pub fn with_rail(mut self, rail: u32, voltage: f32, current: f32) -> Self {
        self.rails.push(RailReading {
            rail,
            voltage,
            current,
        });
        self
    }

    pub fn with_env(mut self, temperature: f32, humidity: f32) -> Self {
        self.env = Some(EnvSample {
            temperature,
            humidity,
        });
        self
    }

    pub fn with_event(mut self, rail: u32, diagnostic: impl Into<String>) -> Self {
        self.event = Some(PowerEvent {
            rail,
            diagnostic: diagnostic.into(),
        });
        self
    }
}
