//! Perception capability ports and their pipeline-facing adapters.
//!
//! The object-detection model, the text-recognition model and the
//! cascade-based region proposer are external capabilities: the pipeline
//! consumes them through the traits below and never reimplements them.
//! Implementations are loaded once at startup and shared by handle across
//! all media units.

mod adapter;
mod factory;

pub use adapter::{DetectionAdapter, RecognitionAdapter};
pub use factory::build_default;

use image::{DynamicImage, GrayImage};
use std::sync::Arc;

use crate::models::{BoundingBox, VehicleCandidate};
use crate::Result;

/// Object detection over a full frame.
///
/// Implementations return candidates in the coordinates of the frame they
/// were given; the [`DetectionAdapter`] handles downscaling and mapping
/// boxes back to original-frame coordinates.
pub trait VehicleDetector: Send + Sync {
    /// Detects objects in a frame.
    fn detect(&self, frame: &DynamicImage) -> Result<Vec<VehicleCandidate>>;
}

/// Text recognition over an enhanced plate crop.
pub trait TextRecognizer: Send + Sync {
    /// Returns zero or more raw text candidates read from the region.
    fn recognize(&self, region: &GrayImage) -> Result<Vec<String>>;
}

/// Cascade-style plate localizer, restricted to a vehicle crop.
pub trait PlateRegionProposer: Send + Sync {
    /// Returns zero or more candidate plate rectangles within the crop.
    fn propose(&self, crop: &GrayImage) -> Result<Vec<BoundingBox>>;
}

/// The process-scoped bundle of perception capabilities.
///
/// Constructed once at startup and passed by handle into the pipeline;
/// never re-instantiated per unit.
#[derive(Clone)]
pub struct PerceptionSet {
    /// Vehicle detector handle.
    pub detector: Arc<dyn VehicleDetector>,
    /// Text recognizer handle.
    pub recognizer: Arc<dyn TextRecognizer>,
    /// Optional plate-region proposer handle.
    pub proposer: Option<Arc<dyn PlateRegionProposer>>,
}

impl std::fmt::Debug for PerceptionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerceptionSet")
            .field("proposer", &self.proposer.is_some())
            .finish_non_exhaustive()
    }
}

impl PerceptionSet {
    /// Bundles capability handles.
    #[must_use]
    pub fn new(
        detector: Arc<dyn VehicleDetector>,
        recognizer: Arc<dyn TextRecognizer>,
        proposer: Option<Arc<dyn PlateRegionProposer>>,
    ) -> Self {
        Self {
            detector,
            recognizer,
            proposer,
        }
    }
}
