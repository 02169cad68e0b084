//! Media enumeration, frame decoding and stride sampling.
//!
//! Enumeration happens once per batch run: files added afterwards are not
//! picked up. Decoding is a capability port like the perception models --
//! a still-image decoder backed by the `image` crate ships here, video
//! codec bindings plug in through the same trait.

use image::DynamicImage;
use std::fs;
use std::path::Path;

use crate::models::{MediaKind, MediaUnit};
use crate::{Error, Result};

/// One decoded frame of a media unit.
pub struct Frame {
    /// 1-based frame index within the unit.
    pub index: u64,
    /// Decoded pixels.
    pub image: DynamicImage,
}

/// A finite, non-restartable sequence of frames for one media unit.
pub trait FrameStream {
    /// Returns the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Container-reported frame rate, when known.
    fn frame_rate(&self) -> Option<f64> {
        None
    }
}

impl std::fmt::Debug for dyn FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream").finish_non_exhaustive()
    }
}

/// Opens media units for frame-by-frame reading.
pub trait FrameDecoder: Send + Sync {
    /// Opens a unit, returning its frame stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnreadableMedia`] when the file cannot be decoded.
    fn open(&self, unit: &MediaUnit) -> Result<Box<dyn FrameStream>>;
}

/// Built-in decoder for still images.
///
/// Video units are reported unreadable: codec bindings are an external
/// capability and wire in through their own [`FrameDecoder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StillImageDecoder;

struct SingleFrame(Option<DynamicImage>);

impl FrameStream for SingleFrame {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.0.take().map(|image| Frame { index: 1, image }))
    }
}

impl FrameDecoder for StillImageDecoder {
    fn open(&self, unit: &MediaUnit) -> Result<Box<dyn FrameStream>> {
        match unit.kind {
            MediaKind::Image => {
                let image = image::open(&unit.path).map_err(|e| Error::UnreadableMedia {
                    unit: unit.id.clone(),
                    cause: e.to_string(),
                })?;
                Ok(Box::new(SingleFrame(Some(image))))
            },
            MediaKind::Video => Err(Error::UnreadableMedia {
                unit: unit.id.clone(),
                cause: "no video decoder available".to_string(),
            }),
        }
    }
}

/// Enumerates supported media files in a directory, sorted by file name.
///
/// # Errors
///
/// Returns [`Error::NoInputFound`] when the directory is absent or holds
/// no supported media. Non-fatal to callers: log and skip the batch.
pub fn enumerate_units(dir: &Path) -> Result<Vec<MediaUnit>> {
    let entries = fs::read_dir(dir).map_err(|_| Error::NoInputFound {
        path: dir.to_path_buf(),
    })?;

    let mut units: Vec<MediaUnit> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| MediaUnit::from_path(entry.path()))
        .collect();
    units.sort_by(|a, b| a.id.cmp(&b.id));

    if units.is_empty() {
        return Err(Error::NoInputFound {
            path: dir.to_path_buf(),
        });
    }
    Ok(units)
}

/// Applies the profile's frame stride to a stream and tracks elapsed
/// media time.
pub struct FrameSampler {
    stream: Box<dyn FrameStream>,
    stride: u64,
    frame_rate: f64,
    frames_seen: u64,
}

impl FrameSampler {
    /// Wraps a stream with a sampling stride.
    ///
    /// The stream's own frame rate wins over the unit's when it reports
    /// one; a stride of zero is treated as one.
    #[must_use]
    pub fn new(stream: Box<dyn FrameStream>, stride: u64, unit: &MediaUnit) -> Self {
        let frame_rate = stream.frame_rate().unwrap_or(unit.frame_rate);
        Self {
            stream,
            stride: stride.max(1),
            frame_rate: if frame_rate > 0.0 {
                frame_rate
            } else {
                crate::models::DEFAULT_FRAME_RATE
            },
            frames_seen: 0,
        }
    }

    /// Returns the next frame that survives the stride, or `None` at end
    /// of stream.
    pub fn next_sampled(&mut self) -> Result<Option<Frame>> {
        loop {
            let Some(frame) = self.stream.next_frame()? else {
                return Ok(None);
            };
            self.frames_seen += 1;
            if self.frames_seen % self.stride == 0 {
                return Ok(Some(Frame {
                    index: self.frames_seen,
                    image: frame.image,
                }));
            }
        }
    }

    /// Elapsed media time at a frame index, as `mm:ss`.
    #[must_use]
    pub fn media_time(&self, frame_index: u64) -> String {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_seconds = (frame_index as f64 / self.frame_rate) as u64;
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}
