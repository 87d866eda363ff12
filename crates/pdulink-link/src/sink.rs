use pdulink_schema::PowerEvent;

use crate::snapshot::Telemetry;

/// Where the controller delivers decoded data.
///
/// Called synchronously on the read loop thread, once per report, so
/// implementations should hand off quickly (see [`crate::QueueSink`]).
pub trait TelemetrySink {
    /// A report carried rail readings or environment data.
    fn on_telemetry(&mut self, telemetry: Telemetry);

    /// A report carried a diagnostic event.
    fn on_event(&mut self, event: PowerEvent);
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn on_telemetry(&mut self, telemetry: Telemetry) {
        (**self).on_telemetry(telemetry);
    }

    fn on_event(&mut self, event: PowerEvent) {
        (**self).on_event(event);
    }
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for &mut S {
    fn on_telemetry(&mut self, telemetry: Telemetry) {
        (**self).on_telemetry(telemetry);
    }

    fn on_event(&mut self, event: PowerEvent) {
        (**self).on_event(event);
    }
}
