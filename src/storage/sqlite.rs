//! `SQLite` backend for the registry and the ledger.
//!
//! A single `Mutex<Connection>` serializes writes; WAL mode and
//! `busy_timeout` (see [`super::configure_connection`]) keep concurrent
//! batch workers from tripping over `SQLITE_BUSY`.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{acquire_lock, configure_connection, format_timestamp, parse_timestamp};
use crate::models::{AccessSession, AccessStatus, VehicleCategory, VehicleRegistryRecord};
use crate::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vehicles (
    plate       TEXT PRIMARY KEY,
    category    TEXT NOT NULL,
    status      TEXT NOT NULL,
    owner       TEXT,
    note        TEXT
);

CREATE TABLE IF NOT EXISTS access_sessions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    plate       TEXT NOT NULL,
    entered_at  TEXT NOT NULL,
    exited_at   TEXT,
    source_unit TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_sessions_plate ON access_sessions(plate);
CREATE INDEX IF NOT EXISTS idx_sessions_open
    ON access_sessions(plate) WHERE exited_at IS NULL;
";

/// What a ledger toggle did for a confirmed plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageOutcome {
    /// No open session existed; an entry was recorded.
    Entered,
    /// An open session existed; it was closed with an exit timestamp.
    Exited,
}

impl PassageOutcome {
    /// Human-readable label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entered => "ENTRY",
            Self::Exited => "EXIT",
        }
    }
}

/// Row counts for the status report.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCounts {
    /// Registered vehicles.
    pub vehicles: u64,
    /// All sessions, open and closed.
    pub sessions: u64,
    /// Sessions without an exit timestamp.
    pub open_sessions: u64,
}

/// `SQLite`-backed vehicle registry and access ledger.
pub struct AccessStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl AccessStore {
    /// Opens (creating if needed) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when the database cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Storage {
                    operation: "open".to_string(),
                    cause: format!("cannot create {}: {e}", parent.display()),
                })?;
            }
        }
        let conn = Connection::open(path).map_err(storage_err("open"))?;
        let store = Self::from_connection(conn, Some(path.to_path_buf()))?;
        debug!(path = %path.display(), "access store opened");
        Ok(store)
    }

    /// Opens an in-memory store; used by the test suites and embedders
    /// that do not need persistence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err("open"))?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn);
        conn.execute_batch(SCHEMA).map_err(storage_err("init_schema"))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Filesystem path of the database, when file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Inserts or fully replaces a registry record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on database failure.
    pub fn upsert_vehicle(&self, record: &VehicleRegistryRecord) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "INSERT OR REPLACE INTO vehicles (plate, category, status, owner, note)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.plate,
                record.category.as_str(),
                record.status.as_str(),
                record.owner,
                record.note,
            ],
        )
        .map_err(storage_err("upsert_vehicle"))?;
        Ok(())
    }

    /// Looks up a registry record by normalized plate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on database failure, or
    /// [`Error::InvalidInput`] when a stored category or status string is
    /// unknown.
    pub fn get_vehicle(&self, plate: &str) -> Result<Option<VehicleRegistryRecord>> {
        let conn = acquire_lock(&self.conn);
        let row = conn
            .query_row(
                "SELECT plate, category, status, owner, note
                 FROM vehicles WHERE plate = ?1",
                params![plate],
                raw_registry_row,
            )
            .optional()
            .map_err(storage_err("get_vehicle"))?;
        row.map(RawRegistryRow::into_record).transpose()
    }

    /// Lists the whole registry, ordered by plate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on database failure.
    pub fn list_vehicles(&self) -> Result<Vec<VehicleRegistryRecord>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT plate, category, status, owner, note
                 FROM vehicles ORDER BY plate",
            )
            .map_err(storage_err("list_vehicles"))?;
        let rows = stmt
            .query_map([], raw_registry_row)
            .map_err(storage_err("list_vehicles"))?;

        let mut records = Vec::new();
        for row in rows {
            let raw = row.map_err(storage_err("list_vehicles"))?;
            match raw.into_record() {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "skipping malformed registry row"),
            }
        }
        Ok(records)
    }

    /// Toggles the ledger for a plate: closes the open session if one
    /// exists, otherwise opens a new one.
    ///
    /// The lookup and the write happen inside one immediate transaction,
    /// so no interleaving of concurrent workers can leave a plate with
    /// two open sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on database failure.
    pub fn record_passage(
        &self,
        plate: &str,
        at: NaiveDateTime,
        source_unit: &str,
    ) -> Result<PassageOutcome> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_err("record_passage"))?;

        let open_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM access_sessions
                 WHERE plate = ?1 AND exited_at IS NULL
                 ORDER BY id DESC LIMIT 1",
                params![plate],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err("record_passage"))?;

        let outcome = match open_id {
            Some(id) => {
                tx.execute(
                    "UPDATE access_sessions SET exited_at = ?1 WHERE id = ?2",
                    params![format_timestamp(at), id],
                )
                .map_err(storage_err("record_passage"))?;
                PassageOutcome::Exited
            },
            None => {
                tx.execute(
                    "INSERT INTO access_sessions (plate, entered_at, exited_at, source_unit)
                     VALUES (?1, ?2, NULL, ?3)",
                    params![plate, format_timestamp(at), source_unit],
                )
                .map_err(storage_err("record_passage"))?;
                PassageOutcome::Entered
            },
        };

        tx.commit().map_err(storage_err("record_passage"))?;
        Ok(outcome)
    }

    /// Returns every open session, oldest entry first.
    ///
    /// Rows with unparseable timestamps are skipped with a warning rather
    /// than failing the whole report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on database failure.
    pub fn open_sessions(&self) -> Result<Vec<AccessSession>> {
        self.query_sessions(
            "SELECT id, plate, entered_at, exited_at, source_unit
             FROM access_sessions WHERE exited_at IS NULL ORDER BY entered_at",
            None,
            "open_sessions",
        )
    }

    /// Returns the full session history, newest entry first, optionally
    /// filtered to one plate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on database failure.
    pub fn history(&self, plate: Option<&str>) -> Result<Vec<AccessSession>> {
        match plate {
            Some(plate) => self.query_sessions(
                "SELECT id, plate, entered_at, exited_at, source_unit
                 FROM access_sessions WHERE plate = ?1 ORDER BY id DESC",
                Some(plate),
                "history",
            ),
            None => self.query_sessions(
                "SELECT id, plate, entered_at, exited_at, source_unit
                 FROM access_sessions ORDER BY id DESC",
                None,
                "history",
            ),
        }
    }

    /// Row counts for the status report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on database failure.
    pub fn counts(&self) -> Result<StoreCounts> {
        let conn = acquire_lock(&self.conn);
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = conn
                .query_row(sql, [], |row| row.get(0))
                .map_err(storage_err("counts"))?;
            Ok(u64::try_from(n).unwrap_or(0))
        };
        Ok(StoreCounts {
            vehicles: count("SELECT COUNT(*) FROM vehicles")?,
            sessions: count("SELECT COUNT(*) FROM access_sessions")?,
            open_sessions: count(
                "SELECT COUNT(*) FROM access_sessions WHERE exited_at IS NULL",
            )?,
        })
    }

    fn query_sessions(
        &self,
        sql: &str,
        plate: Option<&str>,
        operation: &'static str,
    ) -> Result<Vec<AccessSession>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn.prepare(sql).map_err(storage_err(operation))?;

        let raw_rows: Vec<rusqlite::Result<RawSessionRow>> = match plate {
            Some(plate) => stmt
                .query_map(params![plate], raw_session_row)
                .map_err(storage_err(operation))?
                .collect(),
            None => stmt
                .query_map([], raw_session_row)
                .map_err(storage_err(operation))?
                .collect(),
        };

        let mut sessions = Vec::new();
        for row in raw_rows {
            let raw = row.map_err(storage_err(operation))?;
            match raw.into_session() {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(error = %e, "skipping malformed ledger row"),
            }
        }
        Ok(sessions)
    }
}

fn storage_err(operation: &'static str) -> impl Fn(rusqlite::Error) -> Error {
    move |e| Error::Storage {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

struct RawRegistryRow {
    plate: String,
    category: String,
    status: String,
    owner: Option<String>,
    note: Option<String>,
}

fn raw_registry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRegistryRow> {
    Ok(RawRegistryRow {
        plate: row.get(0)?,
        category: row.get(1)?,
        status: row.get(2)?,
        owner: row.get(3)?,
        note: row.get(4)?,
    })
}

impl RawRegistryRow {
    fn into_record(self) -> Result<VehicleRegistryRecord> {
        Ok(VehicleRegistryRecord {
            plate: self.plate,
            category: VehicleCategory::parse(&self.category)?,
            status: AccessStatus::parse(&self.status)?,
            owner: self.owner,
            note: self.note,
        })
    }
}

struct RawSessionRow {
    id: i64,
    plate: String,
    entered_at: String,
    exited_at: Option<String>,
    source_unit: String,
}

fn raw_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSessionRow> {
    Ok(RawSessionRow {
        id: row.get(0)?,
        plate: row.get(1)?,
        entered_at: row.get(2)?,
        exited_at: row.get(3)?,
        source_unit: row.get(4)?,
    })
}

impl RawSessionRow {
    fn into_session(self) -> Result<AccessSession> {
        Ok(AccessSession {
            id: self.id,
            plate: self.plate,
            entered_at: parse_timestamp(&self.entered_at)?,
            exited_at: self.exited_at.as_deref().map(parse_timestamp).transpose()?,
            source_unit: self.source_unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn record(plate: &str, status: AccessStatus) -> VehicleRegistryRecord {
        VehicleRegistryRecord {
            plate: plate.to_string(),
            category: VehicleCategory::Private,
            status,
            owner: Some("Facilities".to_string()),
            note: None,
        }
    }

    #[test]
    fn test_registry_upsert_and_get() {
        let store = AccessStore::in_memory().unwrap();
        store
            .upsert_vehicle(&record("ABC1234", AccessStatus::Authorized))
            .unwrap();

        let found = store.get_vehicle("ABC1234").unwrap().unwrap();
        assert_eq!(found.status, AccessStatus::Authorized);
        assert_eq!(found.owner.as_deref(), Some("Facilities"));
        assert!(store.get_vehicle("XYZ9999").unwrap().is_none());
    }

    #[test]
    fn test_registry_replace_keeps_one_row() {
        let store = AccessStore::in_memory().unwrap();
        store
            .upsert_vehicle(&record("ABC1234", AccessStatus::Authorized))
            .unwrap();
        store
            .upsert_vehicle(&record("ABC1234", AccessStatus::Incident))
            .unwrap();

        let all = store.list_vehicles().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, AccessStatus::Incident);
    }

    #[test]
    fn test_list_vehicles_ordered_by_plate() {
        let store = AccessStore::in_memory().unwrap();
        for plate in ["XYZ9999", "ABC1234", "DEF5678"] {
            store
                .upsert_vehicle(&record(plate, AccessStatus::Authorized))
                .unwrap();
        }
        let plates: Vec<String> = store
            .list_vehicles()
            .unwrap()
            .into_iter()
            .map(|r| r.plate)
            .collect();
        assert_eq!(plates, vec!["ABC1234", "DEF5678", "XYZ9999"]);
    }

    #[test]
    fn test_passage_toggle_alternates() {
        let store = AccessStore::in_memory().unwrap();

        let first = store.record_passage("ABC1234", at(8, 0), "gate.mp4").unwrap();
        assert_eq!(first, PassageOutcome::Entered);

        let second = store.record_passage("ABC1234", at(9, 30), "gate.mp4").unwrap();
        assert_eq!(second, PassageOutcome::Exited);

        let third = store.record_passage("ABC1234", at(13, 0), "gate.mp4").unwrap();
        assert_eq!(third, PassageOutcome::Entered);

        // Two sessions total: one closed, one open.
        let history = store.history(Some("ABC1234")).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].is_open());
        assert_eq!(history[1].exited_at, Some(at(9, 30)));
    }

    #[test]
    fn test_at_most_one_open_session_per_plate() {
        let store = AccessStore::in_memory().unwrap();
        for hour in 8..14 {
            store.record_passage("ABC1234", at(hour, 0), "cam").unwrap();
        }
        let open: Vec<AccessSession> = store
            .history(Some("ABC1234"))
            .unwrap()
            .into_iter()
            .filter(AccessSession::is_open)
            .collect();
        assert!(open.len() <= 1);
    }

    #[test]
    fn test_open_sessions_oldest_first() {
        let store = AccessStore::in_memory().unwrap();
        store.record_passage("XYZ9999", at(10, 0), "cam").unwrap();
        store.record_passage("ABC1234", at(8, 0), "cam").unwrap();

        let open = store.open_sessions().unwrap();
        let plates: Vec<&str> = open.iter().map(|s| s.plate.as_str()).collect();
        assert_eq!(plates, vec!["ABC1234", "XYZ9999"]);
    }

    #[test]
    fn test_history_unfiltered_newest_first() {
        let store = AccessStore::in_memory().unwrap();
        store.record_passage("ABC1234", at(8, 0), "cam").unwrap();
        store.record_passage("XYZ9999", at(9, 0), "cam").unwrap();

        let history = store.history(None).unwrap();
        assert_eq!(history[0].plate, "XYZ9999");
        assert_eq!(history[1].plate, "ABC1234");
    }

    #[test]
    fn test_coarse_timestamp_rows_still_read() {
        let store = AccessStore::in_memory().unwrap();
        {
            let conn = acquire_lock(&store.conn);
            conn.execute(
                "INSERT INTO access_sessions (plate, entered_at, exited_at, source_unit)
                 VALUES ('ABC1234', '2025-03-14 08:00:00', NULL, 'cam')",
                [],
            )
            .unwrap();
        }
        let open = store.open_sessions().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].entered_at, at(8, 0));
    }

    #[test]
    fn test_malformed_timestamp_rows_skipped() {
        let store = AccessStore::in_memory().unwrap();
        store.record_passage("ABC1234", at(8, 0), "cam").unwrap();
        {
            let conn = acquire_lock(&store.conn);
            conn.execute(
                "INSERT INTO access_sessions (plate, entered_at, exited_at, source_unit)
                 VALUES ('XYZ9999', 'not a timestamp', NULL, 'cam')",
                [],
            )
            .unwrap();
        }
        let open = store.open_sessions().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].plate, "ABC1234");
    }

    #[test]
    fn test_counts() {
        let store = AccessStore::in_memory().unwrap();
        store
            .upsert_vehicle(&record("ABC1234", AccessStatus::Authorized))
            .unwrap();
        store.record_passage("ABC1234", at(8, 0), "cam").unwrap();
        store.record_passage("ABC1234", at(9, 0), "cam").unwrap();
        store.record_passage("ABC1234", at(10, 0), "cam").unwrap();

        let counts = store.counts().unwrap();
        assert_eq!(counts.vehicles, 1);
        assert_eq!(counts.sessions, 2);
        assert_eq!(counts.open_sessions, 1);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gatewatch.db");
        let store = AccessStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        store.record_passage("ABC1234", at(8, 0), "cam").unwrap();
    }
}
