//! # Gatewatch
//!
//! Campus perimeter access control built around a plate-recognition
//! pipeline and an entry/exit ledger.
//!
//! Gatewatch processes batches of still images and video files, detects
//! vehicles, extracts and normalizes Brazilian license plates, confirms
//! readings through temporal consensus, and records campus entries and
//! exits in SQLite. Security alerts fire for unauthorized or flagged
//! vehicles, and the monitoring view surfaces sessions that exceed the
//! configured dwell time.
//!
//! ## Architecture
//!
//! - Perception models (object detection, OCR, the cascade plate
//!   localizer) and video codecs are **capability ports**: traits the
//!   pipeline consumes, never reimplements.
//! - The three batch variants of the original deployment are one pipeline
//!   parameterized by a [`config::PipelineProfile`].
//! - Storage is a single SQLite database behind a mutex; the entry/exit
//!   toggle runs its read-then-write inside one transaction so at most one
//!   open session can exist per plate.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gatewatch::{PipelineProfile, runner::BatchRunner};
//!
//! let runner = BatchRunner::new(
//!     perception,
//!     decoder,
//!     store,
//!     alerts,
//!     PipelineProfile::video_single(),
//!     workers,
//! );
//! let rows = runner.run(&config.videos_dir)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

pub mod alert;
pub mod config;
pub mod ingest;
pub mod ledger;
pub mod models;
pub mod perception;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod storage;

// Re-exports for convenience
pub use config::{GatewatchConfig, PipelineProfile};
pub use ledger::AccessLedger;
pub use models::{
    AccessSession, AccessStatus, AlertEvent, ConfirmedReading, MediaKind, MediaUnit,
    VehicleCategory, VehicleRegistryRecord,
};
pub use pipeline::UnitProcessor;
pub use storage::AccessStore;

/// Error type for gatewatch operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations. The variants follow the pipeline's failure taxonomy:
/// only `NoInputFound` at startup is fatal to a batch run; everything else
/// degrades to "this one item is skipped".
#[derive(Debug, ThisError)]
pub enum Error {
    /// The input location is missing or holds no supported media.
    ///
    /// Raised once at batch startup; logged and the batch is skipped.
    #[error("no input media found at {path}")]
    NoInputFound {
        /// The location that was scanned.
        path: PathBuf,
    },

    /// A media file could not be decoded.
    ///
    /// The unit is skipped and the batch continues.
    #[error("unreadable media '{unit}': {cause}")]
    UnreadableMedia {
        /// Identifier of the media unit.
        unit: String,
        /// The underlying decode failure.
        cause: String,
    },

    /// A perception adapter (detection, OCR, region proposal) failed.
    ///
    /// Callers catch this at the call site and treat it as zero
    /// candidates; it never propagates out of the pipeline.
    #[error("perception adapter '{adapter}' failed: {cause}")]
    Perception {
        /// Name of the failing adapter.
        adapter: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// A storage operation failed.
    #[error("storage operation '{operation}' failed: {cause}")]
    Storage {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A persisted timestamp matched neither accepted format.
    ///
    /// The affected row is skipped when rendering reports; never fatal.
    #[error("timestamp '{value}' does not match an accepted format")]
    TimestampParse {
        /// The offending stored value.
        value: String,
    },

    /// Invalid input was provided (malformed plate, unknown profile name,
    /// bad registry field).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Feature not enabled (requires a compile-time backend flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for gatewatch operations.
pub type Result<T> = std::result::Result<T, Error>;
