//! Thin contract wrappers around the perception capabilities.
//!
//! Adapter failures are caught here and treated as "zero candidates" --
//! never propagated -- but logged at a diagnostic level so the swallowed
//! failures stay observable.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use tracing::debug;

use super::{TextRecognizer, VehicleDetector};
use crate::models::VehicleCandidate;

/// Detection wrapper: downscaling, coordinate mapping and filtering.
pub struct DetectionAdapter<'a> {
    detector: &'a dyn VehicleDetector,
    input_size: u32,
    confidence_threshold: f32,
}

impl<'a> DetectionAdapter<'a> {
    /// Wraps a detector with the profile's input size and confidence
    /// threshold.
    #[must_use]
    pub fn new(detector: &'a dyn VehicleDetector, input_size: u32, confidence_threshold: f32) -> Self {
        Self {
            detector,
            input_size,
            confidence_threshold,
        }
    }

    /// Detects vehicles in a frame, returning boxes in original-frame
    /// coordinates.
    ///
    /// Frames whose longest side exceeds the configured input size are
    /// downscaled before detection to bound model cost; returned boxes
    /// are rescaled back and clamped to the frame. Only vehicle classes
    /// above the confidence threshold survive.
    #[must_use]
    pub fn detect_vehicles(&self, frame: &DynamicImage) -> Vec<VehicleCandidate> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Vec::new();
        }

        #[allow(clippy::cast_precision_loss)]
        let scale = self.input_size as f32 / width.max(height) as f32;

        let (input, inverse_scale) = if scale < 1.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let resized = frame.resize_exact(
                ((width as f32 * scale).round() as u32).max(1),
                ((height as f32 * scale).round() as u32).max(1),
                FilterType::Triangle,
            );
            (resized, 1.0 / scale)
        } else {
            (frame.clone(), 1.0)
        };

        let candidates = match self.detector.detect(&input) {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!(error = %e, "vehicle detector failed, treating as zero candidates");
                return Vec::new();
            },
        };

        candidates
            .into_iter()
            .filter(|c| c.class.is_vehicle() && c.confidence > self.confidence_threshold)
            .map(|c| VehicleCandidate {
                bbox: c.bbox.scaled(inverse_scale).clamped(width, height),
                ..c
            })
            .filter(|c| !c.bbox.is_empty())
            .collect()
    }
}

/// Recognition wrapper: failure containment only.
pub struct RecognitionAdapter<'a> {
    recognizer: &'a dyn TextRecognizer,
}

impl<'a> RecognitionAdapter<'a> {
    /// Wraps a recognizer.
    #[must_use]
    pub fn new(recognizer: &'a dyn TextRecognizer) -> Self {
        Self { recognizer }
    }

    /// Reads raw text candidates from an enhanced region; adapter errors
    /// become an empty result.
    #[must_use]
    pub fn read_text(&self, region: &GrayImage) -> Vec<String> {
        match self.recognizer.recognize(region) {
            Ok(texts) => texts,
            Err(e) => {
                debug!(error = %e, "text recognizer failed, treating as zero candidates");
                Vec::new()
            },
        }
    }
}
