//! Batch orchestration: drives the recognition pipeline over a directory
//! of media units and applies the results to the access ledger.
//!
//! Workers share one store and one alert sink; each unit is processed by
//! exactly one worker and units never interleave their ledger writes with
//! their own frames, so per-unit confirmation order is preserved.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{info, warn};

use crate::alert::AlertSink;
use crate::config::PipelineProfile;
use crate::ingest::{enumerate_units, FrameDecoder};
use crate::ledger::AccessLedger;
use crate::models::MediaUnit;
use crate::perception::PerceptionSet;
use crate::pipeline::UnitProcessor;
use crate::storage::{AccessStore, PassageOutcome};
use crate::Result;

/// One result row of a batch run.
///
/// A unit yields one row per confirmed plate, a single `plate: None` row
/// when nothing was confirmed, or a single `error` row when it could not
/// be read.
#[derive(Debug, Clone)]
pub struct BatchRow {
    /// Source media unit.
    pub unit: String,
    /// Confirmed plate, or `None` when the unit produced no confirmation.
    pub plate: Option<String>,
    /// Elapsed media time of the confirmation, for video units.
    pub media_time: Option<String>,
    /// What the ledger toggle did, when a ledger write happened.
    pub passage: Option<PassageOutcome>,
    /// Whether the confirmation raised a security alert.
    pub alerted: bool,
    /// Failure description for unreadable units.
    pub error: Option<String>,
}

impl BatchRow {
    fn not_found(unit: &MediaUnit) -> Self {
        Self {
            unit: unit.id.clone(),
            plate: None,
            media_time: None,
            passage: None,
            alerted: false,
            error: None,
        }
    }

    fn unreadable(unit: &MediaUnit, cause: String) -> Self {
        Self {
            error: Some(cause),
            ..Self::not_found(unit)
        }
    }
}

/// Runs a recognition batch over a directory of media units.
pub struct BatchRunner {
    perception: Arc<PerceptionSet>,
    decoder: Arc<dyn FrameDecoder>,
    store: Arc<AccessStore>,
    alerts: Arc<dyn AlertSink>,
    profile: PipelineProfile,
    workers: usize,
}

impl BatchRunner {
    /// Creates a runner. `workers` is clamped to at least one.
    #[must_use]
    pub fn new(
        perception: Arc<PerceptionSet>,
        decoder: Arc<dyn FrameDecoder>,
        store: Arc<AccessStore>,
        alerts: Arc<dyn AlertSink>,
        profile: PipelineProfile,
        workers: usize,
    ) -> Self {
        Self {
            perception,
            decoder,
            store,
            alerts,
            profile,
            workers: workers.max(1),
        }
    }

    /// Processes every media unit under `input_dir` and returns the
    /// result rows in unit enumeration order.
    ///
    /// Unreadable units become error rows rather than failing the batch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoInputFound`] when the directory is
    /// missing or holds no supported media.
    pub fn run(&self, input_dir: &Path) -> Result<Vec<BatchRow>> {
        let units = enumerate_units(input_dir)?;
        let workers = self.workers.min(units.len());
        info!(
            units = units.len(),
            workers,
            profile = self.profile.name,
            "starting batch"
        );

        if workers <= 1 {
            let mut rows = Vec::new();
            for unit in &units {
                rows.extend(self.process_one(unit));
            }
            return Ok(rows);
        }

        let cursor = AtomicUsize::new(0);
        let results: Mutex<Vec<(usize, Vec<BatchRow>)>> = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(unit) = units.get(index) else {
                        break;
                    };
                    let rows = self.process_one(unit);
                    match results.lock() {
                        Ok(mut guard) => guard.push((index, rows)),
                        Err(poisoned) => poisoned.into_inner().push((index, rows)),
                    }
                });
            }
        });

        let mut indexed = results.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().flat_map(|(_, rows)| rows).collect())
    }

    fn process_one(&self, unit: &MediaUnit) -> Vec<BatchRow> {
        let processor = UnitProcessor::new(&self.perception, &self.profile);
        let confirmed = match processor.process_unit(unit, self.decoder.as_ref()) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!(unit = %unit.id, error = %e, "unit skipped");
                return vec![BatchRow::unreadable(unit, e.to_string())];
            },
        };

        if confirmed.is_empty() {
            return vec![BatchRow::not_found(unit)];
        }

        let ledger = AccessLedger::new(&self.store, self.alerts.as_ref());
        confirmed
            .into_iter()
            .map(|reading| {
                let media_time = reading.media_time.clone();
                match ledger.apply(&reading) {
                    Ok(update) => BatchRow {
                        unit: unit.id.clone(),
                        plate: Some(update.plate),
                        media_time,
                        passage: Some(update.passage),
                        alerted: update.alerted,
                        error: None,
                    },
                    Err(e) => BatchRow {
                        unit: unit.id.clone(),
                        plate: Some(reading.plate),
                        media_time,
                        passage: None,
                        alerted: false,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MemoryAlertSink;
    use crate::ingest::StillImageDecoder;
    use crate::models::{BoundingBox, VehicleCandidate, VehicleClass};
    use crate::perception::{PlateRegionProposer, TextRecognizer, VehicleDetector};
    use image::{DynamicImage, GrayImage};
    use std::fs;

    struct WholeFrameDetector;

    impl VehicleDetector for WholeFrameDetector {
        fn detect(&self, frame: &DynamicImage) -> Result<Vec<VehicleCandidate>> {
            Ok(vec![VehicleCandidate {
                bbox: BoundingBox::new(0, 0, frame.width(), frame.height()),
                class: VehicleClass::Car,
                confidence: 0.95,
            }])
        }
    }

    struct FixedRecognizer(&'static str);

    impl TextRecognizer for FixedRecognizer {
        fn recognize(&self, _region: &GrayImage) -> Result<Vec<String>> {
            Ok(vec![self.0.to_string()])
        }
    }

    fn perception(plate: &'static str) -> Arc<PerceptionSet> {
        Arc::new(PerceptionSet::new(
            Arc::new(WholeFrameDetector),
            Arc::new(FixedRecognizer(plate)),
            None::<Arc<dyn PlateRegionProposer>>,
        ))
    }

    fn image_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            image::RgbImage::new(64, 64)
                .save(dir.path().join(name))
                .unwrap();
        }
        dir
    }

    fn runner(plate: &'static str, workers: usize) -> (BatchRunner, Arc<AccessStore>, Arc<MemoryAlertSink>) {
        let store = Arc::new(AccessStore::in_memory().unwrap());
        let alerts = Arc::new(MemoryAlertSink::new());
        let runner = BatchRunner::new(
            perception(plate),
            Arc::new(StillImageDecoder),
            Arc::clone(&store),
            Arc::clone(&alerts) as Arc<dyn AlertSink>,
            PipelineProfile::image_batch(),
            workers,
        );
        (runner, store, alerts)
    }

    #[test]
    fn test_missing_dir_is_no_input() {
        let (runner, _, _) = runner("ABC1234", 1);
        assert!(runner.run(Path::new("/nonexistent/batch")).is_err());
    }

    #[test]
    fn test_batch_confirms_and_toggles() {
        let dir = image_dir(&["a.png", "b.png"]);
        let (runner, store, alerts) = runner("ABC1234", 1);

        let rows = runner.run(dir.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].plate.as_deref(), Some("ABC1234"));
        assert_eq!(rows[0].passage, Some(PassageOutcome::Entered));
        assert_eq!(rows[1].passage, Some(PassageOutcome::Exited));

        // Unknown plate auto-enrolls as unauthorized and alerts each time.
        assert_eq!(alerts.events().len(), 2);
        assert!(store.get_vehicle("ABC1234").unwrap().is_some());
    }

    #[test]
    fn test_unreadable_unit_becomes_error_row() {
        let dir = image_dir(&["a.png"]);
        fs::write(dir.path().join("b.png"), b"not an image").unwrap();
        let (runner, _, _) = runner("ABC1234", 1);

        let rows = runner.run(dir.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].error.is_none());
        assert!(rows[1].error.is_some());
        assert!(rows[1].plate.is_none());
    }

    #[test]
    fn test_rows_keep_enumeration_order_with_workers() {
        let dir = image_dir(&["a.png", "b.png", "c.png", "d.png"]);
        let (runner, _, _) = runner("ABC1234", 4);

        let rows = runner.run(dir.path()).unwrap();
        let units: Vec<&str> = rows.iter().map(|r| r.unit.as_str()).collect();
        assert_eq!(units, vec!["a.png", "b.png", "c.png", "d.png"]);
    }

    #[test]
    fn test_rejected_reading_is_not_found_row() {
        let dir = image_dir(&["a.png"]);
        // Too short after sanitization; the normalizer rejects it.
        let (runner, store, _) = runner("AB1", 1);

        let rows = runner.run(dir.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].plate.is_none());
        assert!(rows[0].error.is_none());
        assert_eq!(store.counts().unwrap().sessions, 0);
    }
}
