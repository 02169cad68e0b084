//! Configuration management.

mod profile;

pub use profile::{EnhancementProfile, PipelineProfile, RoiFallback};

use serde::Deserialize;
use std::path::PathBuf;

/// Default maximum dwell time before an open session is flagged, in
/// minutes.
pub const DEFAULT_DWELL_LIMIT_MINUTES: i64 = 240;

/// Main configuration for gatewatch.
#[derive(Debug, Clone)]
pub struct GatewatchConfig {
    /// Path to the SQLite database.
    pub db_path: PathBuf,
    /// Directory holding still-image inputs.
    pub images_dir: PathBuf,
    /// Directory holding video inputs.
    pub videos_dir: PathBuf,
    /// Open sessions older than this many minutes are flagged as
    /// exceeded in the monitoring view.
    pub dwell_limit_minutes: i64,
    /// Number of worker threads processing media units in parallel.
    pub workers: usize,
}

impl Default for GatewatchConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("gatewatch.db"),
            images_dir: PathBuf::from("data/inputs/images"),
            videos_dir: PathBuf::from("data/inputs/videos"),
            dwell_limit_minutes: DEFAULT_DWELL_LIMIT_MINUTES,
            workers: 1,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Database path.
    pub db_path: Option<String>,
    /// Image input directory.
    pub images_dir: Option<String>,
    /// Video input directory.
    pub videos_dir: Option<String>,
    /// Dwell limit in minutes.
    pub dwell_limit_minutes: Option<i64>,
    /// Worker thread count.
    pub workers: Option<usize>,
}

impl GatewatchConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &std::path::Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("read {}: {e}", path.display())))?;

        let file: ConfigFile = toml::from_str(&contents)
            .map_err(|e| crate::Error::Config(format!("parse {}: {e}", path.display())))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location
    /// (`<config dir>/gatewatch/config.toml`), falling back to defaults
    /// when no file exists.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let config_path = base_dirs
            .config_dir()
            .join("gatewatch")
            .join("config.toml");
        if config_path.exists() {
            if let Ok(config) = Self::load_from_file(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `GatewatchConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(db_path) = file.db_path {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(images_dir) = file.images_dir {
            config.images_dir = PathBuf::from(images_dir);
        }
        if let Some(videos_dir) = file.videos_dir {
            config.videos_dir = PathBuf::from(videos_dir);
        }
        if let Some(limit) = file.dwell_limit_minutes {
            config.dwell_limit_minutes = limit;
        }
        if let Some(workers) = file.workers {
            config.workers = workers.max(1);
        }

        config
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Sets the image input directory.
    #[must_use]
    pub fn with_images_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.images_dir = path.into();
        self
    }

    /// Sets the video input directory.
    #[must_use]
    pub fn with_videos_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.videos_dir = path.into();
        self
    }
}
