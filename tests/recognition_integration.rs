//! Recognition pipeline integration tests.
//!
//! Drives the full per-unit flow with scripted perception backends:
//! frame sampling, detection, region extraction, enhancement, OCR,
//! normalization, consensus and the ledger write.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use gatewatch::alert::{AlertSink, MemoryAlertSink};
use gatewatch::ingest::{Frame, FrameDecoder, FrameStream, StillImageDecoder};
use gatewatch::models::{
    AccessStatus, BoundingBox, MediaUnit, VehicleCandidate, VehicleCategory, VehicleClass,
    VehicleRegistryRecord,
};
use gatewatch::perception::{PerceptionSet, TextRecognizer, VehicleDetector};
use gatewatch::runner::BatchRunner;
use gatewatch::storage::PassageOutcome;
use gatewatch::{AccessStore, PipelineProfile, Result, UnitProcessor};
use image::{DynamicImage, GrayImage, RgbImage};

// ============================================================================
// Test Helpers
// ============================================================================

/// Detector that reports the whole frame as one car.
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

/// Recognizer that replays a script, one entry per invocation, then
/// returns nothing.
struct ScriptedRecognizer {
    script: Mutex<Vec<Vec<String>>>,
    calls: Mutex<usize>,
}

impl ScriptedRecognizer {
    fn new(script: &[&[&str]]) -> Self {
        let script = script
            .iter()
            .rev()
            .map(|texts| texts.iter().map(ToString::to_string).collect())
            .collect();
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, _region: &GrayImage) -> Result<Vec<String>> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.script.lock().unwrap().pop().unwrap_or_default())
    }
}

/// Decoder that synthesizes a fixed number of frames for any unit.
struct SyntheticVideoDecoder {
    frames: u64,
}

struct SyntheticStream {
    remaining: u64,
    served: u64,
}

impl FrameStream for SyntheticStream {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.served += 1;
        Ok(Some(Frame {
            index: self.served,
            image: DynamicImage::ImageRgb8(RgbImage::new(64, 64)),
        }))
    }

    fn frame_rate(&self) -> Option<f64> {
        Some(30.0)
    }
}

impl FrameDecoder for SyntheticVideoDecoder {
    fn open(&self, _unit: &MediaUnit) -> Result<Box<dyn FrameStream>> {
        Ok(Box::new(SyntheticStream {
            remaining: self.frames,
            served: 0,
        }))
    }
}

fn perception(recognizer: Arc<ScriptedRecognizer>) -> PerceptionSet {
    PerceptionSet::new(Arc::new(WholeFrameDetector), recognizer, None)
}

fn video_unit(name: &str) -> MediaUnit {
    MediaUnit::from_path(Path::new(name).to_path_buf()).expect("supported extension")
}

// ============================================================================
// Image batch
// ============================================================================

#[test]
fn test_image_unit_votes_at_end() {
    // Three OCR candidates from one image; the plurality wins the
    // end-of-unit vote.
    let recognizer = Arc::new(ScriptedRecognizer::new(&[&[
        "ABC-1234", "ABC1234", "XYZ9999",
    ]]));
    let perception = perception(Arc::clone(&recognizer));
    let profile = PipelineProfile::image_batch();
    let processor = UnitProcessor::new(&perception, &profile);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gate.png");
    RgbImage::new(64, 64).save(&path).unwrap();
    let unit = MediaUnit::from_path(path).unwrap();

    let confirmed = processor.process_unit(&unit, &StillImageDecoder).unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].plate, "ABC1234");
    // Images carry no media time.
    assert_eq!(confirmed[0].media_time, None);
}

// ============================================================================
// Single-vehicle video
// ============================================================================

#[test]
fn test_video_single_confirms_majority_and_stops() {
    // Sampled frames are 3, 6, 9, 12, 15; the majority of the five
    // samples confirms despite two misreads, and the unit stops there.
    let recognizer = Arc::new(ScriptedRecognizer::new(&[
        &["ABC1234"],
        &["A8C1234"],
        &["ABC1234"],
        &["XYZ9999"],
        &["ABC1234"],
    ]));
    let perception = perception(Arc::clone(&recognizer));
    let profile = PipelineProfile::video_single();
    let processor = UnitProcessor::new(&perception, &profile);

    let decoder = SyntheticVideoDecoder { frames: 60 };
    let confirmed = processor
        .process_unit(&video_unit("entrance.mp4"), &decoder)
        .unwrap();

    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].plate, "ABC1234");
    // Frame 15 at 30 fps is within the first second of footage.
    assert_eq!(confirmed[0].media_time.as_deref(), Some("00:00"));
    // Early stop: no frames were sampled past the confirmation.
    assert_eq!(recognizer.calls(), 5);
}

#[test]
fn test_video_single_without_agreement_confirms_nothing() {
    let recognizer = Arc::new(ScriptedRecognizer::new(&[
        &["AAA1111"],
        &["BBB2222"],
        &["CCC3333"],
        &["DDD4444"],
        &["EEE5555"],
        &["FFF6666"],
    ]));
    let perception = perception(recognizer);
    let profile = PipelineProfile::video_single();
    let processor = UnitProcessor::new(&perception, &profile);

    let decoder = SyntheticVideoDecoder { frames: 18 };
    let confirmed = processor
        .process_unit(&video_unit("entrance.mp4"), &decoder)
        .unwrap();
    assert!(confirmed.is_empty());
}

// ============================================================================
// Multi-vehicle video
// ============================================================================

#[test]
fn test_video_multi_confirms_successive_vehicles() {
    // Stride 2 samples frames 2, 4, 6, ... Two vehicles pass in
    // sequence; each reaches the plurality threshold and the unit keeps
    // going after the first confirmation. The winning vote clears the
    // buffer, so the second plate needs three agreeing samples of its
    // own.
    let recognizer = Arc::new(ScriptedRecognizer::new(&[
        &["ABC1234"],
        &["ABC1234"],
        &["XYZ9999"],
        &["XYZ9999"],
        &["XYZ9999"],
        &["XYZ9999"],
    ]));
    let perception = perception(Arc::clone(&recognizer));
    let profile = PipelineProfile::video_multi();
    let processor = UnitProcessor::new(&perception, &profile);

    let decoder = SyntheticVideoDecoder { frames: 12 };
    let confirmed = processor
        .process_unit(&video_unit("avenue.mp4"), &decoder)
        .unwrap();

    let plates: Vec<&str> = confirmed.iter().map(|c| c.plate.as_str()).collect();
    assert_eq!(plates, vec!["ABC1234", "XYZ9999"]);
    // All twelve frames were decoded; six survived the stride.
    assert_eq!(recognizer.calls(), 6);
}

#[test]
fn test_video_multi_applies_grammar_correction() {
    // 'S' in a digit position is a confusable; the high-precision
    // profile corrects it before consensus.
    let recognizer = Arc::new(ScriptedRecognizer::new(&[
        &["ABC-12S4"],
        &["ABC-12S4"],
        &["ABC-12S4"],
    ]));
    let perception = perception(recognizer);
    let profile = PipelineProfile::video_multi();
    let processor = UnitProcessor::new(&perception, &profile);

    let decoder = SyntheticVideoDecoder { frames: 6 };
    let confirmed = processor
        .process_unit(&video_unit("avenue.mp4"), &decoder)
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].plate, "ABC1254");
}

// ============================================================================
// Batch runner to ledger
// ============================================================================

#[test]
fn test_batch_applies_confirmations_to_ledger() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["in.png", "out.png"] {
        RgbImage::new(64, 64).save(dir.path().join(name)).unwrap();
    }

    // Same plate confirmed from both images: entry then exit.
    let recognizer = Arc::new(ScriptedRecognizer::new(&[&["ABC1234"], &["ABC1234"]]));
    let store = Arc::new(AccessStore::in_memory().unwrap());
    store
        .upsert_vehicle(&VehicleRegistryRecord {
            plate: "ABC1234".to_string(),
            category: VehicleCategory::Private,
            status: AccessStatus::Authorized,
            owner: Some("Registrar".to_string()),
            note: None,
        })
        .unwrap();
    let alerts = Arc::new(MemoryAlertSink::new());

    let runner = BatchRunner::new(
        Arc::new(perception(recognizer)),
        Arc::new(StillImageDecoder),
        Arc::clone(&store),
        Arc::clone(&alerts) as Arc<dyn AlertSink>,
        PipelineProfile::image_batch(),
        1,
    );
    let rows = runner.run(dir.path()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].passage, Some(PassageOutcome::Entered));
    assert_eq!(rows[1].passage, Some(PassageOutcome::Exited));
    // Authorized vehicle: no alerts.
    assert!(alerts.events().is_empty());
    assert_eq!(store.counts().unwrap().open_sessions, 0);
}

#[test]
fn test_batch_alerts_on_unknown_plate() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::new(64, 64).save(dir.path().join("gate.png")).unwrap();

    let recognizer = Arc::new(ScriptedRecognizer::new(&[&["XYZ9999"]]));
    let store = Arc::new(AccessStore::in_memory().unwrap());
    let alerts = Arc::new(MemoryAlertSink::new());

    let runner = BatchRunner::new(
        Arc::new(perception(recognizer)),
        Arc::new(StillImageDecoder),
        Arc::clone(&store),
        Arc::clone(&alerts) as Arc<dyn AlertSink>,
        PipelineProfile::image_batch(),
        1,
    );
    let rows = runner.run(dir.path()).unwrap();

    assert!(rows[0].alerted);
    let enrolled = store.get_vehicle("XYZ9999").unwrap().unwrap();
    assert_eq!(enrolled.category, VehicleCategory::Visitor);
    assert_eq!(enrolled.status, AccessStatus::Unauthorized);
    assert_eq!(alerts.events().len(), 1);
    assert_eq!(alerts.events()[0].plate, "XYZ9999");
}
