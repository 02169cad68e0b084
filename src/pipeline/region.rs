//! Plate-region extraction within a vehicle crop.
//!
//! A cascade-style localizer is tried first; when it proposes nothing the
//! extractor falls back to a fixed geometric heuristic, since nearly all
//! plates sit in the lower center of a vehicle crop.

use image::GrayImage;
use tracing::debug;

use crate::config::RoiFallback;
use crate::models::BoundingBox;
use crate::perception::PlateRegionProposer;

/// Margin added on each side of a proposed plate rectangle.
const PROPOSAL_MARGIN: f32 = 0.10;

/// Selects the sub-region of a vehicle crop most likely to hold the plate.
///
/// With a proposer: the largest-area candidate, expanded by 10% per side
/// and clamped to the crop. Without one (or when it proposes nothing): the
/// profile's fallback fractions. Returns `None` when the resulting region
/// has zero area; callers must skip the candidate.
pub fn extract_plate_region(
    crop: &GrayImage,
    proposer: Option<&dyn PlateRegionProposer>,
    fallback: RoiFallback,
) -> Option<BoundingBox> {
    let (width, height) = crop.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let region = proposer
        .and_then(|p| {
            let proposals = match p.propose(crop) {
                Ok(proposals) => proposals,
                Err(e) => {
                    debug!(error = %e, "plate proposer failed, using geometric fallback");
                    Vec::new()
                },
            };
            proposals
                .into_iter()
                .max_by_key(BoundingBox::area)
                .map(|best| best.expanded(PROPOSAL_MARGIN, width, height))
        })
        .unwrap_or_else(|| {
            BoundingBox::from_fractions(
                width,
                height,
                fallback.left,
                fallback.right,
                fallback.top,
                fallback.bottom,
            )
        });

    let region = region.clamped(width, height);
    if region.is_empty() {
        None
    } else {
        Some(region)
    }
}
