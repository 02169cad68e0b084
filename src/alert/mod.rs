//! Security alert delivery.
//!
//! Alerts are fire-and-forget: a sink failure must never stall or fail
//! the recognition batch, so [`AlertSink::emit`] is infallible and sinks
//! swallow their own delivery problems.

use std::sync::Mutex;
use tracing::warn;

use crate::models::AlertEvent;

/// Receives security alerts raised for confirmed readings.
pub trait AlertSink: Send + Sync {
    /// Delivers one alert. Implementations handle their own failures.
    fn emit(&self, event: &AlertEvent);
}

/// Sink that writes alerts to the structured log at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn emit(&self, event: &AlertEvent) {
        warn!(
            plate = %event.plate,
            status = %event.status,
            source = %event.source_unit,
            at = %event.at,
            "security alert"
        );
    }
}

/// Sink that collects alerts in memory, for embedders and tests.
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl MemoryAlertSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the alerts collected so far.
    #[must_use]
    pub fn events(&self) -> Vec<AlertEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AlertSink for MemoryAlertSink {
    fn emit(&self, event: &AlertEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
