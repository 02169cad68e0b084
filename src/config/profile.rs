//! Pipeline profiles.
//!
//! The original deployment ran three near-identical batch scripts that
//! differed only in sampling and thresholds. Here they are one pipeline
//! parameterized by a profile record.

use crate::{Error, Result};

/// Enhancement applied to a plate crop before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancementProfile {
    /// Grayscale + tile-based local contrast equalization.
    Contrast,
    /// 3x cubic upscale, grayscale, edge-preserving denoise, white border.
    HighPrecision,
}

/// Geometric fallback used when no plate region is proposed: fractional
/// extents of the vehicle crop.
#[derive(Debug, Clone, Copy)]
pub struct RoiFallback {
    /// Left edge as a fraction of crop width.
    pub left: f32,
    /// Right edge as a fraction of crop width.
    pub right: f32,
    /// Top edge as a fraction of crop height.
    pub top: f32,
    /// Bottom edge as a fraction of crop height.
    pub bottom: f32,
}

impl RoiFallback {
    /// Bottom 60-100% of the crop height, middle 70% of the width.
    pub const BOTTOM_WIDE: Self = Self {
        left: 0.15,
        right: 0.85,
        top: 0.60,
        bottom: 1.0,
    };

    /// Bottom 55-95% of the crop height, middle 60% of the width.
    pub const CENTER_FOCUS: Self = Self {
        left: 0.20,
        right: 0.80,
        top: 0.55,
        bottom: 0.95,
    };
}

/// Everything that distinguishes one batch variant from another.
#[derive(Debug, Clone)]
pub struct PipelineProfile {
    /// Profile name, for logs and CLI selection.
    pub name: &'static str,
    /// Process every Nth video frame. Ignored for images.
    pub frame_stride: u64,
    /// Longest frame side handed to the detector; larger frames are
    /// downscaled first and boxes rescaled back.
    pub detect_input_size: u32,
    /// Minimum detector confidence for a candidate to be kept.
    pub detect_confidence: f32,
    /// Enhancement applied before recognition.
    pub enhancement: EnhancementProfile,
    /// Whether the Brazilian position-grammar corrector runs after
    /// sanitization.
    pub grammar_correction: bool,
    /// Whether the cascade plate proposer is consulted before the
    /// geometric fallback.
    pub use_region_proposer: bool,
    /// Geometric fallback fractions.
    pub roi_fallback: RoiFallback,
    /// Buffer size at which an incremental consensus vote is taken.
    pub min_samples: usize,
    /// Minimum frequency of the winner for confirmation.
    pub min_frequency: usize,
    /// Buffer size past which an unconfirmed buffer is cleared.
    pub buffer_cap: usize,
    /// Take a final plurality vote when the unit ends (image profile).
    pub vote_at_end: bool,
    /// Stop processing the unit after the first confirmation
    /// (single-vehicle video profile).
    pub stop_after_confirm: bool,
}

impl PipelineProfile {
    /// Still-image batches: one vote over everything read from the image,
    /// sanitize-only normalization.
    #[must_use]
    pub const fn image_batch() -> Self {
        Self {
            name: "image-batch",
            frame_stride: 1,
            detect_input_size: 640,
            detect_confidence: 0.40,
            enhancement: EnhancementProfile::Contrast,
            grammar_correction: false,
            use_region_proposer: true,
            roi_fallback: RoiFallback::BOTTOM_WIDE,
            // Incremental confirmation disabled; the vote happens at
            // end-of-unit over whatever accumulated.
            min_samples: usize::MAX,
            min_frequency: 1,
            buffer_cap: usize::MAX,
            vote_at_end: true,
            stop_after_confirm: false,
        }
    }

    /// Videos with one vehicle each: stride 3, majority of 5 samples,
    /// stop at the first confirmation.
    #[must_use]
    pub const fn video_single() -> Self {
        Self {
            name: "video-single",
            frame_stride: 3,
            detect_input_size: 640,
            detect_confidence: 0.40,
            enhancement: EnhancementProfile::Contrast,
            grammar_correction: false,
            use_region_proposer: true,
            roi_fallback: RoiFallback::BOTTOM_WIDE,
            min_samples: 5,
            min_frequency: 3,
            buffer_cap: 10,
            vote_at_end: false,
            stop_after_confirm: true,
        }
    }

    /// High-precision multi-vehicle videos: stride 2, plurality of 3,
    /// grammar correction, keep going after each confirmation.
    #[must_use]
    pub const fn video_multi() -> Self {
        Self {
            name: "video-multi",
            frame_stride: 2,
            detect_input_size: 640,
            detect_confidence: 0.40,
            enhancement: EnhancementProfile::HighPrecision,
            grammar_correction: true,
            use_region_proposer: false,
            roi_fallback: RoiFallback::CENTER_FOCUS,
            min_samples: 3,
            min_frequency: 2,
            buffer_cap: 10,
            vote_at_end: false,
            stop_after_confirm: false,
        }
    }

    /// Looks a profile up by CLI name.
    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "image-batch" | "images" => Ok(Self::image_batch()),
            "video-single" => Ok(Self::video_single()),
            "video-multi" => Ok(Self::video_multi()),
            other => Err(Error::InvalidInput(format!(
                "unknown profile '{other}' (expected image-batch, video-single or video-multi)"
            ))),
        }
    }
}
