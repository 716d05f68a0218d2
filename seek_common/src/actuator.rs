//! Actuator capabilities consumed by the control core.
//!
//! A mechanism is assembled by injecting one [`MeasurementSource`] and one
//! [`OutputSink`]. Hardware drivers implement both on their device handle;
//! the simulation plant implements both on a shared handle.
//!
//! # Contract
//!
//! | Operation | Units | Blocking |
//! |-----------|-------|----------|
//! | `position()` | mechanism units | never |
//! | `velocity()` | mechanism units/s | never |
//! | `set_output()` | normalized [-1, 1] | never |
//! | `stop()` | n/a | never |
//!
//! Sensor faults are the driver's concern; they surface here only as
//! stale or zero measurements.

/// Reports the measured state of the mechanism.
pub trait MeasurementSource {
    /// Measured position [mechanism units].
    fn position(&self) -> f64;

    /// Measured velocity [mechanism units/s].
    fn velocity(&self) -> f64;
}

/// Accepts normalized drive commands.
pub trait OutputSink {
    /// Apply a normalized command in [-1, 1].
    fn set_output(&mut self, value: f64);

    /// Stop driving immediately.
    fn stop(&mut self);
}

impl<T: MeasurementSource + ?Sized> MeasurementSource for Box<T> {
    #[inline]
    fn position(&self) -> f64 {
        (**self).position()
    }

    #[inline]
    fn velocity(&self) -> f64 {
        (**self).velocity()
    }
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    #[inline]
    fn set_output(&mut self, value: f64) {
        (**self).set_output(value)
    }

    #[inline]
    fn stop(&mut self) {
        (**self).stop()
    }
}
