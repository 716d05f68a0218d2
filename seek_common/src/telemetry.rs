//! Telemetry sinks.
//!
//! The control core emits key/value diagnostics every cycle through a
//! [`TelemetrySink`]. Recording is fire-and-forget: sinks must not block
//! and must not fail back into the control cycle.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

/// Destination for per-cycle diagnostics.
pub trait TelemetrySink: Send + Sync {
    /// Record the latest `value` for `key`.
    fn record(&self, key: &str, value: f64);
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    #[inline]
    fn record(&self, _key: &str, _value: f64) {}
}

/// Forwards records as `trace!` events on the `telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    #[inline]
    fn record(&self, key: &str, value: f64) {
        trace!(target: "telemetry", key, value);
    }
}

/// Keeps the latest value per key in memory.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    latest: Mutex<HashMap<String, f64>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.latest.lock().get(key).copied()
    }

    /// Copy of all latest values, sorted by key.
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        let mut entries: Vec<(String, f64)> = self
            .latest
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&self, key: &str, value: f64) {
        let mut latest = self.latest.lock();
        match latest.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                latest.insert(key.to_string(), value);
            }
        }
    }
}
