//! Readings, sessions and alert events.

use super::AccessStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One OCR output after normalization, for one vehicle candidate.
///
/// Ephemeral: feeds the consensus buffer and is then discarded.
#[derive(Debug, Clone)]
pub struct PlateReading {
    /// Raw text as returned by the recognizer.
    pub raw: String,
    /// Normalized plate; `None` means the reading was rejected.
    pub normalized: Option<String>,
    /// Frame offset within the media unit the reading came from.
    pub frame_index: u64,
}

/// A plate string that passed the consensus engine's frequency threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedReading {
    /// The confirmed, normalized plate.
    pub plate: String,
    /// Wall-clock time of confirmation.
    pub at: NaiveDateTime,
    /// Elapsed media time (`mm:ss`) at confirmation; `None` for images.
    pub media_time: Option<String>,
    /// Identifier of the source media unit.
    pub source_unit: String,
}

/// Persistent entry/exit record for one campus visit.
///
/// Invariant: at most one session per plate has `exited_at == None` at any
/// time. Sessions are created and closed by the ledger toggle, never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSession {
    /// Row id.
    pub id: i64,
    /// Normalized plate.
    pub plate: String,
    /// Entry timestamp.
    pub entered_at: NaiveDateTime,
    /// Exit timestamp; `None` while the vehicle is on campus.
    pub exited_at: Option<NaiveDateTime>,
    /// Identifier of the media unit the entry reading came from.
    pub source_unit: String,
}

impl AccessSession {
    /// Whether the session is still open (vehicle on campus).
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.exited_at.is_none()
    }

    /// Minutes elapsed from entry to `now`, for open-session monitoring.
    #[must_use]
    pub fn minutes_on_site(&self, now: NaiveDateTime) -> i64 {
        (now - self.entered_at).num_minutes()
    }
}

/// Security alert emitted for a confirmed reading.
///
/// Derived, not persisted by the core; delivery is fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Detection time.
    pub at: NaiveDateTime,
    /// The plate that triggered the alert.
    pub plate: String,
    /// Registry status that caused the alert.
    pub status: AccessStatus,
    /// Identifier of the source media unit.
    pub source_unit: String,
}
