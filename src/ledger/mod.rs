//! The access ledger: turns confirmed readings into registry and session
//! updates.
//!
//! For every confirmed reading the ledger looks the plate up in the
//! registry, auto-enrolls unknown plates, raises a security alert when
//! the registry status demands one, and then toggles the entry/exit
//! session. Alerts fire before the ledger write so an unauthorized
//! sighting is reported even if the write then fails.

use tracing::{info, warn};

use crate::alert::AlertSink;
use crate::models::{AlertEvent, ConfirmedReading, VehicleRegistryRecord};
use crate::storage::{AccessStore, PassageOutcome};
use crate::Result;

/// Outcome of applying one confirmed reading to the ledger.
#[derive(Debug, Clone)]
pub struct LedgerUpdate {
    /// The plate that was applied.
    pub plate: String,
    /// Registry record the plate resolved to (possibly just enrolled).
    pub record: VehicleRegistryRecord,
    /// Whether the plate was enrolled by this update.
    pub newly_enrolled: bool,
    /// Whether a security alert was raised.
    pub alerted: bool,
    /// What the session toggle did.
    pub passage: PassageOutcome,
}

/// Applies confirmed readings to the registry and the session ledger.
pub struct AccessLedger<'a> {
    store: &'a AccessStore,
    alerts: &'a dyn AlertSink,
}

impl<'a> AccessLedger<'a> {
    /// Creates a ledger over a store and an alert sink.
    #[must_use]
    pub fn new(store: &'a AccessStore, alerts: &'a dyn AlertSink) -> Self {
        Self { store, alerts }
    }

    /// Applies one confirmed reading.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Storage`] when the registry or the session
    /// write fails. The alert, if due, has already been emitted.
    pub fn apply(&self, reading: &ConfirmedReading) -> Result<LedgerUpdate> {
        let (record, newly_enrolled) = match self.store.get_vehicle(&reading.plate)? {
            Some(record) => (record, false),
            None => {
                let record = VehicleRegistryRecord::auto_enrolled(&reading.plate);
                self.store.upsert_vehicle(&record)?;
                info!(plate = %reading.plate, "auto-enrolled unknown plate");
                (record, true)
            },
        };

        let alerted = record.status.is_alerting();
        if alerted {
            self.alerts.emit(&AlertEvent {
                at: reading.at,
                plate: reading.plate.clone(),
                status: record.status,
                source_unit: reading.source_unit.clone(),
            });
        }

        let passage = self
            .store
            .record_passage(&reading.plate, reading.at, &reading.source_unit)?;
        info!(
            plate = %reading.plate,
            passage = passage.as_str(),
            source = %reading.source_unit,
            "ledger updated"
        );

        Ok(LedgerUpdate {
            plate: reading.plate.clone(),
            record,
            newly_enrolled,
            alerted,
            passage,
        })
    }

    /// Applies a batch of confirmed readings in order.
    ///
    /// A failed reading is logged and skipped so one bad write does not
    /// drop the remaining confirmations of the unit.
    pub fn apply_all(&self, readings: &[ConfirmedReading]) -> Vec<LedgerUpdate> {
        let mut updates = Vec::with_capacity(readings.len());
        for reading in readings {
            match self.apply(reading) {
                Ok(update) => updates.push(update),
                Err(e) => {
                    warn!(plate = %reading.plate, error = %e, "ledger update failed, skipping");
                },
            }
        }
        updates
    }
}
