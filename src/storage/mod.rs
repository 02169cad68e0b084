//! Persistent storage: the vehicle registry and the access ledger.

mod sqlite;

pub use sqlite::{AccessStore, PassageOutcome, StoreCounts};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

use crate::{Error, Result};

/// Timestamp format written by the ledger (sub-second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Older rows were written without sub-second precision; reads accept
/// both formats.
pub const TIMESTAMP_FORMAT_COARSE: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp the way the ledger stores it.
#[must_use]
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp, accepting both precision variants.
///
/// # Errors
///
/// Returns [`Error::TimestampParse`] when neither format matches; callers
/// rendering reports skip the affected row and continue.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT_COARSE))
        .map_err(|_| Error::TimestampParse {
            value: value.to_string(),
        })
}

/// Helper to acquire the connection lock with poison recovery.
///
/// If the mutex is poisoned by a panic in a previous critical section we
/// recover the inner value and log a warning; the connection state is
/// still valid and refusing all further storage work would be worse.
pub(crate) fn acquire_lock(mutex: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("storage mutex was poisoned, recovering");
            poisoned.into_inner()
        },
    }
}

/// Configures a connection for concurrent batch workers.
///
/// WAL mode allows concurrent readers with a single writer and
/// `busy_timeout` waits out lock contention instead of failing
/// immediately.
pub(crate) fn configure_connection(conn: &Connection) {
    // journal_mode returns a string result; errors here are non-fatal.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");
}
