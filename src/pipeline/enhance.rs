//! Plate-crop enhancement ahead of recognition.
//!
//! Two deterministic transforms, both pure functions of the input crop:
//!
//! - `Contrast`: grayscale plus clip-limited tile equalization, cheap
//!   enough to run on every candidate.
//! - `HighPrecision`: 3x cubic upscale, grayscale, edge-preserving
//!   bilateral denoise and a fixed white padding border, used by the
//!   multi-vehicle profile where recognition quality matters more than
//!   throughput.

use image::imageops::FilterType;
use image::{imageops, DynamicImage, GrayImage, Luma};
use imageproc::filter::bilateral_filter;

use crate::config::EnhancementProfile;

/// Tiles per axis for local contrast equalization.
const TILE_GRID: u32 = 8;

/// Histogram clip limit, as a multiple of the uniform bin height.
const CLIP_LIMIT: f32 = 2.0;

/// Upscale factor for the high-precision profile.
const UPSCALE: u32 = 3;

/// White padding added on each side in the high-precision profile, in
/// pixels. OCR engines segment better with quiet margins around glyphs.
const PAD: u32 = 20;

/// Applies the profile's enhancement to a plate crop.
#[must_use]
pub fn enhance(crop: &DynamicImage, profile: EnhancementProfile) -> GrayImage {
    match profile {
        EnhancementProfile::Contrast => tile_equalize(&crop.to_luma8()),
        EnhancementProfile::HighPrecision => {
            let (width, height) = (crop.width().max(1), crop.height().max(1));
            let upscaled = crop.resize_exact(
                width * UPSCALE,
                height * UPSCALE,
                FilterType::CatmullRom,
            );
            let denoised = bilateral_filter(&upscaled.to_luma8(), 11, 17.0, 17.0);
            pad_white(&denoised, PAD)
        },
    }
}

/// Clip-limited histogram equalization per tile of an 8x8 grid.
///
/// Equalizing locally lifts plate glyphs out of shadow or glare that a
/// global equalization would average away.
fn tile_equalize(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let mut out = GrayImage::new(width, height);
    let tile_w = width.div_ceil(TILE_GRID);
    let tile_h = height.div_ceil(TILE_GRID);

    for ty in 0..TILE_GRID {
        for tx in 0..TILE_GRID {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            if x0 >= width || y0 >= height {
                continue;
            }
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let total = (x1 - x0) * (y1 - y0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let limit = ((CLIP_LIMIT * total as f32 / 256.0).max(1.0)) as u32;

            // Clip the histogram and spread the excess uniformly.
            let mut excess = 0u32;
            for bin in &mut hist {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let bonus = excess / 256;
            for bin in &mut hist {
                *bin += bonus;
            }

            let mut lut = [0u8; 256];
            let mut cumulative = 0u32;
            let denom = f32::max(total as f32, 1.0);
            for (value, bin) in hist.iter().enumerate() {
                cumulative += bin;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    lut[value] = ((cumulative as f32 / denom) * 255.0).round().min(255.0) as u8;
                }
            }

            for y in y0..y1 {
                for x in x0..x1 {
                    let v = gray.get_pixel(x, y)[0];
                    out.put_pixel(x, y, Luma([lut[v as usize]]));
                }
            }
        }
    }

    out
}

/// Surrounds the image with a `pad`-pixel white border.
fn pad_white(gray: &GrayImage, pad: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut out = GrayImage::from_pixel(width + 2 * pad, height + 2 * pad, Luma([255]));
    imageops::replace(&mut out, gray, i64::from(pad), i64::from(pad));
    out
}
