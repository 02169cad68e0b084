//! The per-unit recognition pipeline.
//!
//! One media unit flows through: frame sampling, vehicle detection, plate
//! region extraction, enhancement, text recognition, normalization and
//! temporal consensus. The pipeline is synchronous and runs each unit to
//! its natural termination (end of stream, or early confirmation for the
//! single-vehicle profile).

mod consensus;
mod enhance;
pub mod normalize;
mod region;

pub use consensus::ConsensusEngine;
pub use enhance::enhance;
pub use region::extract_plate_region;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::PipelineProfile;
use crate::ingest::{FrameDecoder, FrameSampler};
use crate::models::{ConfirmedReading, MediaKind, MediaUnit, PlateReading};
use crate::perception::{DetectionAdapter, PerceptionSet, RecognitionAdapter};
use crate::Result;

/// Runs the recognition pipeline over single media units.
pub struct UnitProcessor<'a> {
    perception: &'a PerceptionSet,
    profile: &'a PipelineProfile,
}

impl<'a> UnitProcessor<'a> {
    /// Creates a processor over a perception set and a profile.
    #[must_use]
    pub fn new(perception: &'a PerceptionSet, profile: &'a PipelineProfile) -> Self {
        Self {
            perception,
            profile,
        }
    }

    /// Processes one media unit to completion, returning its confirmed
    /// readings in confirmation order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnreadableMedia`] when the unit cannot be
    /// opened. Mid-stream decode failures end the unit early instead of
    /// failing it.
    pub fn process_unit(
        &self,
        unit: &MediaUnit,
        decoder: &dyn FrameDecoder,
    ) -> Result<Vec<ConfirmedReading>> {
        let stream = decoder.open(unit)?;
        let stride = match unit.kind {
            MediaKind::Image => 1,
            MediaKind::Video => self.profile.frame_stride,
        };
        let mut sampler = FrameSampler::new(stream, stride, unit);

        let detection = DetectionAdapter::new(
            self.perception.detector.as_ref(),
            self.profile.detect_input_size,
            self.profile.detect_confidence,
        );
        let recognition = RecognitionAdapter::new(self.perception.recognizer.as_ref());
        let proposer = if self.profile.use_region_proposer {
            self.perception.proposer.as_deref()
        } else {
            None
        };

        let mut engine = ConsensusEngine::new(self.profile);
        let mut confirmed = Vec::new();

        'frames: loop {
            let frame = match sampler.next_sampled() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!(unit = %unit.id, error = %e, "frame decode failed, ending unit early");
                    break;
                },
            };

            for candidate in detection.detect_vehicles(&frame.image) {
                let bbox = candidate.bbox;
                let vehicle_crop = frame.image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
                if vehicle_crop.width() == 0 || vehicle_crop.height() == 0 {
                    continue;
                }

                let Some(plate_region) = extract_plate_region(
                    &vehicle_crop.to_luma8(),
                    proposer,
                    self.profile.roi_fallback,
                ) else {
                    continue;
                };

                let roi = vehicle_crop.crop_imm(
                    plate_region.x,
                    plate_region.y,
                    plate_region.width,
                    plate_region.height,
                );
                let enhanced = enhance(&roi, self.profile.enhancement);

                for raw in recognition.read_text(&enhanced) {
                    let reading = PlateReading {
                        normalized: normalize::normalize(&raw, self.profile.grammar_correction),
                        raw,
                        frame_index: frame.index,
                    };
                    let Some(plate) = reading.normalized else {
                        debug!(unit = %unit.id, raw = %reading.raw, "reading rejected by normalizer");
                        continue;
                    };

                    if let Some(winner) = engine.push(plate) {
                        confirmed.push(confirmed_reading(unit, &sampler, frame.index, winner));
                        if self.profile.stop_after_confirm {
                            break 'frames;
                        }
                    }
                }
            }
        }

        if let Some(winner) = engine.finalize() {
            confirmed.push(confirmed_reading(unit, &sampler, 0, winner));
        }

        info!(
            unit = %unit.id,
            profile = self.profile.name,
            confirmed = confirmed.len(),
            "unit processed"
        );
        Ok(confirmed)
    }
}

fn confirmed_reading(
    unit: &MediaUnit,
    sampler: &FrameSampler,
    frame_index: u64,
    plate: String,
) -> ConfirmedReading {
    let media_time = match unit.kind {
        MediaKind::Video => Some(sampler.media_time(frame_index)),
        MediaKind::Image => None,
    };
    ConfirmedReading {
        plate,
        at: Local::now().naive_local(),
        media_time,
        source_unit: unit.id.clone(),
    }
}
