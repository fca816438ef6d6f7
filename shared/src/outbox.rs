//! Durable local outbox for finalized reports.
//!
//! Reports are stored as JSON payloads in SQLite. A shell answers the core's
//! `SinkOperation::AddReport` with [`SqliteReportStore::add_report`]; whatever carries
//! reports upstream reads them back with [`SqliteReportStore::pending`].

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::capabilities::{SinkError, SinkResult};
use crate::model::{Report, ReportId};

const CURRENT_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store directory unavailable: {0}")]
    Io(#[from] std::io::Error),

    #[error("report payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("report {0} already stored")]
    Duplicate(ReportId),

    #[error("report id {0} does not fit the store")]
    IdOutOfRange(u64),

    #[error("schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for SinkError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(id) => SinkError::Duplicate(id),
            StoreError::Encode(e) => SinkError::Rejected(e.to_string()),
            other => SinkError::Unavailable(other.to_string()),
        }
    }
}

pub struct SqliteReportStore {
    conn: Mutex<Connection>,
}

impl SqliteReportStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(%mode, path = %path.display(), "report store opened");
        Self::initialize(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        let version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::SchemaTooNew {
                found: version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        if version < 1 {
            conn.execute_batch(
                r"
                CREATE TABLE IF NOT EXISTS reports (
                    id INTEGER PRIMARY KEY,
                    payload TEXT NOT NULL,
                    created_at_ms INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_reports_created
                    ON reports(created_at_ms ASC);

                PRAGMA user_version = 1;
                ",
            )?;
            info!("report store schema created");
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Answer to `SinkOperation::AddReport`.
    #[instrument(skip(self, report), fields(report_id = %report.id()))]
    pub fn add_report(&self, report: &Report) -> SinkResult {
        self.insert(report).map_err(|e| {
            warn!(error = %e, "report not stored");
            SinkError::from(e)
        })?;
        info!("report stored in outbox");
        Ok(())
    }

    pub fn insert(&self, report: &Report) -> Result<(), StoreError> {
        let id = sql_id(report.id())?;
        let payload = serde_json::to_string(report)?;
        let created_at_ms = i64::try_from(report.created_at_ms().as_millis()).unwrap_or(i64::MAX);

        let inserted = self.conn()?.execute(
            "INSERT INTO reports (id, payload, created_at_ms) VALUES (?1, ?2, ?3)",
            params![id, payload, created_at_ms],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::Duplicate(report.id()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, id: ReportId) -> Result<Option<Report>, StoreError> {
        let payload: Option<String> = self
            .conn()?
            .query_row(
                "SELECT payload FROM reports WHERE id = ?1",
                params![sql_id(id)?],
                |row| row.get(0),
            )
            .optional()?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(StoreError::from))
            .transpose()
    }

    /// Oldest first. Rows whose payload no longer decodes are skipped.
    pub fn pending(&self, limit: usize) -> Result<Vec<Report>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, payload FROM reports
             ORDER BY created_at_ms ASC, id ASC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = stmt.query_map(params![limit], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut pending = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            match serde_json::from_str::<Report>(&payload) {
                Ok(report) => pending.push(report),
                Err(e) => warn!(id, error = %e, "skipping undecodable report payload"),
            }
        }
        Ok(pending)
    }
}

fn sql_id(id: ReportId) -> Result<i64, StoreError> {
    i64::try_from(id.value()).map_err(|_| StoreError::IdOutOfRange(id.value()))
}
