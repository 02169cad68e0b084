//! Media units: the batch inputs of a run.

use std::fmt;
use std::path::{Path, PathBuf};

/// Frame rate assumed when a video container does not report one.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Supported image file extensions (lowercase).
pub(crate) const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

/// Supported video file extensions (lowercase).
pub(crate) const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Kind of a media unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A single still image.
    Image,
    /// A video file processed frame by frame.
    Video,
}

/// One input file of a batch run. Immutable for the duration of processing.
#[derive(Debug, Clone)]
pub struct MediaUnit {
    /// Identifier: the file name, used as the ledger's source label.
    pub id: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// Image or video.
    pub kind: MediaKind,
    /// Container-reported frame rate; [`DEFAULT_FRAME_RATE`] when the
    /// container reports zero or nothing. Meaningless for images.
    pub frame_rate: f64,
}

impl MediaUnit {
    /// Classifies a path by extension; `None` for unsupported files.
    #[must_use]
    pub fn classify(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Builds a unit from a path, or `None` for unsupported extensions.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let kind = Self::classify(&path)?;
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Self {
            id,
            path,
            kind,
            frame_rate: DEFAULT_FRAME_RATE,
        })
    }

    /// Replaces the frame rate, falling back to the default when the
    /// container reports zero.
    #[must_use]
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = if fps > 0.0 { fps } else { DEFAULT_FRAME_RATE };
        self
    }
}

impl fmt::Display for MediaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
