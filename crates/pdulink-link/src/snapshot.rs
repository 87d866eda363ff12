use pdulink_schema::{EnvSample, RailReading, CHANNELS};
use serde::Serialize;

/// Running per-rail telemetry.
///
/// Slots `1..=MAX_RAIL` hold the last reading seen for each rail, `None`
/// until the first one arrives. Slot 0 is the global channel: the sum of the
/// defined rail slots, `None` while no rail has reported yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    voltage: [Option<f32>; CHANNELS],
    current: [Option<f32>; CHANNELS],
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self {
            voltage: [None; CHANNELS],
            current: [None; CHANNELS],
        }
    }

    /// Merge readings into the snapshot and recompute the global channel.
    ///
    /// Rails not mentioned keep their previous value. Readings must address
    /// rails `1..=MAX_RAIL`; the schema layer rejects anything else before
    /// it gets here.
    pub fn merge(&mut self, readings: &[RailReading]) {
        for reading in readings {
            let slot = reading.rail as usize;
            if slot == 0 || slot >= CHANNELS {
                continue;
            }
            self.voltage[slot] = Some(reading.voltage);
            self.current[slot] = Some(reading.current);
        }
        self.voltage[0] = sum_defined(&self.voltage[1..]);
        self.current[0] = sum_defined(&self.current[1..]);
    }

    pub fn voltage(&self) -> &[Option<f32>; CHANNELS] {
        &self.voltage
    }

    pub fn current(&self) -> &[Option<f32>; CHANNELS] {
        &self.current
    }

    /// Number of physical rails that have reported at least once.
    pub fn defined_rails(&self) -> usize {
        self.voltage[1..].iter().filter(|v| v.is_some()).count()
    }

    /// Copy of the current state, ready to cross a thread boundary.
    pub fn to_telemetry(&self, env: Option<EnvSample>) -> Telemetry {
        Telemetry {
            voltage: self.voltage,
            current: self.current,
            env,
        }
    }
}

fn sum_defined(values: &[Option<f32>]) -> Option<f32> {
    values
        .iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// What a sink receives per report: owned copies, never references into
/// the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    pub voltage: [Option<f32>; CHANNELS],
    pub current: [Option<f32>; CHANNELS],
    pub env: Option<EnvSample>,
}

impl Telemetry {
    /// Power drawn by one rail, in watts.
    ///
    /// Rail 0 is the whole board: the sum of `V * I` over rails with both
    /// readings defined, not the product of the summed channels.
    pub fn power(&self, rail: usize) -> Option<f32> {
        if rail == 0 {
            return self.voltage[1..]
                .iter()
                .zip(&self.current[1..])
                .filter_map(|(v, i)| Some((*v)? * (*i)?))
                .fold(None, |acc, p| Some(acc.unwrap_or(0.0) + p));
        }
        Some(self.voltage.get(rail).copied()?? * self.current.get(rail).copied()??)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(rail: u32, voltage: f32, current: f32) -> RailReading {
        RailReading {
            rail,
            voltage,
            current,
        }
    }

    fn assert_sum_invariant(snapshot: &TelemetrySnapshot) {
        for channel in [snapshot.voltage(), snapshot.current()] {
            let defined: Vec<f32> = channel[1..].iter().flatten().copied().collect();
            if defined.is_empty() {
                assert_eq!(channel[0], None);
            } else {
                let sum: f32 = defined.iter().sum();
                assert!((channel[0].unwrap() - sum).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn starts_undefined() {
        let snapshot = TelemetrySnapshot::new();
        assert!(snapshot.voltage().iter().all(Option::is_none));
        assert!(snapshot.current().iter().all(Option::is_none));
        assert_eq!(snapshot.defined_rails(), 0);
        assert_sum_invariant(&snapshot);
    }

    #[test]
    fn two_rails_aggregate_into_global_channel() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(&[reading(1, 5.0, 0.1), reading(2, 12.0, 0.2)]);

        let mut expected_v = [None; CHANNELS];
        expected_v[0] = Some(17.0);
        expected_v[1] = Some(5.0);
        expected_v[2] = Some(12.0);
        assert_eq!(snapshot.voltage(), &expected_v);

        let current = snapshot.current();
        assert!((current[0].unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(current[1], Some(0.1));
        assert_eq!(current[2], Some(0.2));
        assert!(current[3..].iter().all(Option::is_none));
        assert_sum_invariant(&snapshot);
    }

    #[test]
    fn later_reports_update_only_their_rails() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(&[reading(1, 5.0, 1.0), reading(4, 12.0, 2.0)]);
        snapshot.merge(&[reading(4, 11.5, 3.0)]);

        assert_eq!(snapshot.voltage()[1], Some(5.0));
        assert_eq!(snapshot.voltage()[4], Some(11.5));
        assert_eq!(snapshot.voltage()[0], Some(16.5));
        assert_eq!(snapshot.current()[0], Some(4.0));
        assert_eq!(snapshot.defined_rails(), 2);
        assert_sum_invariant(&snapshot);
    }

    #[test]
    fn zero_reading_is_defined_not_missing() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(&[reading(7, 0.0, 0.0)]);
        assert_eq!(snapshot.voltage()[7], Some(0.0));
        assert_eq!(snapshot.voltage()[0], Some(0.0));
        assert_eq!(snapshot.voltage()[6], None);
    }

    #[test]
    fn replaying_a_report_is_idempotent() {
        let report = [reading(1, 5.0, 0.1), reading(2, 12.0, 0.2), reading(8, 36.0, 0.25)];
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(&report);
        let first = snapshot;
        snapshot.merge(&report);
        assert_eq!(snapshot, first);
    }

    #[test]
    fn power_per_rail_and_total() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(&[reading(1, 5.0, 2.0), reading(2, 12.0, 0.5)]);
        let telemetry = snapshot.to_telemetry(None);
        assert_eq!(telemetry.power(1), Some(10.0));
        assert_eq!(telemetry.power(0), Some(16.0));
        assert_eq!(telemetry.power(3), None);
        assert_eq!(telemetry.power(42), None);
        assert_eq!(TelemetrySnapshot::new().to_telemetry(None).power(0), None);
    }

    #[test]
    fn telemetry_is_a_detached_copy() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(&[reading(1, 5.0, 0.1)]);
        let sent = snapshot.to_telemetry(None);
        snapshot.merge(&[reading(1, 6.0, 0.1)]);
        assert_eq!(sent.voltage[1], Some(5.0));
        assert_eq!(snapshot.voltage()[1], Some(6.0));
    }
}
