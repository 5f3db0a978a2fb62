//! `SQLite`-backed implementation of [`CheckpointStore`].
//!
//! Uses a single `Mutex<Connection>` for thread safety.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use hrsync_types::{
    ExtractionCursor, ProcessName, QualityReport, QuarantinedRecord, RunStats, RunStatus,
    SourceSystem,
};
use rusqlite::{Connection, OptionalExtension};

use crate::backend::CheckpointStore;
use crate::error::{self, StateError};

/// Idempotent DDL for state tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS etl_state (
    process_name TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    current_offset INTEGER NOT NULL DEFAULT 0,
    total_processed INTEGER NOT NULL DEFAULT 0,
    has_more_data INTEGER NOT NULL DEFAULT 1,
    last_updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_name TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    records_read INTEGER DEFAULT 0,
    records_written INTEGER DEFAULT 0,
    validation_warnings INTEGER DEFAULT 0,
    error_message TEXT
);

CREATE TABLE IF NOT EXISTS quarantined_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_name TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES sync_runs(id),
    record_id TEXT NOT NULL,
    source_system TEXT NOT NULL,
    record_json TEXT NOT NULL,
    errors TEXT NOT NULL,
    quarantined_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_quarantine_process_run ON quarantined_records (process_name, run_id);

CREATE TABLE IF NOT EXISTS quality_alerts (
    alert_id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    alert_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    message TEXT NOT NULL,
    source_system TEXT,
    metric_value REAL
);
";

/// `SQLite`-backed checkpoint storage.
///
/// Create with [`SqliteCheckpointStore::open`] for file-backed persistence
/// or [`SqliteCheckpointStore::in_memory`] for tests.
pub struct SqliteCheckpointStore {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointStore {
    /// Open or create a `SQLite` state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created,
    /// or [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Create an in-memory `SQLite` store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't
    /// be initialized.
    pub fn in_memory() -> error::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> error::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(|e| StateError::context("create tables", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    fn to_iso8601(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn now_iso8601() -> String {
        Self::to_iso8601(Utc::now())
    }

    #[cfg(test)]
    fn get_run_row(&self, run_id: i64) -> error::Result<(String, i64, Option<String>, Option<String>)> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT status, records_read, finished_at, error_message FROM sync_runs WHERE id = ?1",
            [run_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .map_err(StateError::from)
    }

    #[cfg(test)]
    fn count_quarantined_for_run(&self, process: &ProcessName, run_id: i64) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM quarantined_records WHERE process_name = ?1 AND run_id = ?2",
            rusqlite::params![process.as_str(), run_id],
            |row| row.get(0),
        )
        .map_err(StateError::from)
    }

    #[cfg(test)]
    fn alert_rows(&self) -> error::Result<Vec<(String, String, Option<String>, Option<f64>)>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT alert_type, severity, source_system, metric_value FROM quality_alerts ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    #[allow(clippy::cast_sign_loss)]
    fn get_cursor(&self, process: &ProcessName) -> error::Result<Option<ExtractionCursor>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT source, current_offset, total_processed, has_more_data, last_updated \
                 FROM etl_state WHERE process_name = ?1",
                [process.as_str()],
                |row| {
                    let source: String = row.get(0)?;
                    let offset: i64 = row.get(1)?;
                    let total: i64 = row.get(2)?;
                    let has_more: bool = row.get(3)?;
                    let last_updated: String = row.get(4)?;
                    Ok((source, offset, total, has_more, last_updated))
                },
            )
            .optional()
            .map_err(|e| StateError::context("get_cursor", e))?;

        let Some((source, offset, total, has_more_data, last_updated)) = row else {
            return Ok(None);
        };

        let corrupt = |reason: String| StateError::Corrupt {
            process: process.to_string(),
            reason,
        };
        let source: SourceSystem = source.parse().map_err(|e| corrupt(format!("{e}")))?;
        let last_updated = DateTime::parse_from_rfc3339(&last_updated)
            .map_err(|e| corrupt(format!("last_updated '{last_updated}': {e}")))?
            .with_timezone(&Utc);

        Ok(Some(ExtractionCursor {
            source,
            offset: offset.max(0) as u64,
            total_processed: total.max(0) as u64,
            has_more_data,
            last_updated,
        }))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn put_cursor(&self, process: &ProcessName, cursor: &ExtractionCursor) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO etl_state \
             (process_name, source, current_offset, total_processed, has_more_data, last_updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(process_name) DO UPDATE SET \
             source = ?2, current_offset = ?3, total_processed = ?4, has_more_data = ?5, last_updated = ?6",
            rusqlite::params![
                process.as_str(),
                cursor.source.as_str(),
                cursor.offset as i64,
                cursor.total_processed as i64,
                cursor.has_more_data,
                Self::to_iso8601(cursor.last_updated),
            ],
        )
        .map_err(|e| StateError::context("put_cursor", e))?;
        Ok(())
    }

    fn start_run(&self, process: &ProcessName) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO sync_runs (process_name, status, started_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![process.as_str(), RunStatus::Running.as_str(), Self::now_iso8601()],
        )
        .map_err(|e| StateError::context("start_run", e))?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(clippy::cast_possible_wrap)]
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE sync_runs SET status = ?1, finished_at = ?2, \
             records_read = ?3, records_written = ?4, validation_warnings = ?5, error_message = ?6 \
             WHERE id = ?7",
            rusqlite::params![
                status.as_str(),
                Self::now_iso8601(),
                stats.records_read as i64,
                stats.records_written as i64,
                stats.validation_warnings as i64,
                stats.error_message,
                run_id,
            ],
        )
        .map_err(|e| StateError::context("complete_run", e))?;
        Ok(())
    }

    fn insert_quarantined(
        &self,
        process: &ProcessName,
        run_id: i64,
        records: &[QuarantinedRecord],
    ) -> error::Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StateError::context("insert_quarantined: begin tx", e))?;
        let mut stmt = tx
            .prepare(
                "INSERT INTO quarantined_records \
                 (process_name, run_id, record_id, source_system, record_json, errors, quarantined_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|e| StateError::context("insert_quarantined: prepare", e))?;

        let mut count = 0u64;
        for record in records {
            stmt.execute(rusqlite::params![
                process.as_str(),
                run_id,
                record.record_id,
                record.source_system.as_str(),
                record.record_json,
                record.errors,
                record.quarantined_at,
            ])
            .map_err(|e| StateError::context("insert_quarantined: execute", e))?;
            count += 1;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| StateError::context("insert_quarantined: commit", e))?;

        Ok(count)
    }

    fn append_alerts(&self, report: &QualityReport) -> error::Result<u64> {
        if report.alerts.is_empty() {
            return Ok(0);
        }

        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StateError::context("append_alerts: begin tx", e))?;
        let mut stmt = tx
            .prepare(
                "INSERT INTO quality_alerts \
                 (alert_id, timestamp, alert_type, severity, message, source_system, metric_value) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(|e| StateError::context("append_alerts: prepare", e))?;

        let timestamp = Self::to_iso8601(report.timestamp);
        let mut count = 0u64;
        for alert in &report.alerts {
            let alert_id = format!(
                "alert_{}_{}",
                report.timestamp.timestamp_millis(),
                &uuid::Uuid::new_v4().simple().to_string()[..9]
            );
            stmt.execute(rusqlite::params![
                alert_id,
                timestamp,
                alert.kind.as_str(),
                alert.severity.as_str(),
                alert.message,
                alert.source_system.map(SourceSystem::as_str),
                alert.metric_value,
            ])
            .map_err(|e| StateError::context("append_alerts: execute", e))?;
            count += 1;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| StateError::context("append_alerts: commit", e))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrsync_types::{Alert, AlertKind, Severity};

    fn process(name: &str) -> ProcessName {
        ProcessName::new(name)
    }

    fn cursor(offset: u64, total: u64, has_more_data: bool) -> ExtractionCursor {
        ExtractionCursor {
            source: SourceSystem::Garoon,
            offset,
            total_processed: total,
            has_more_data,
            last_updated: "2026-01-15T10:00:00.250Z".parse().unwrap(),
        }
    }

    #[test]
    fn cursor_roundtrip() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        assert!(store.get_cursor(&process("p")).unwrap().is_none());

        let written = cursor(300, 287, true);
        store.put_cursor(&process("p"), &written).unwrap();

        let read = store.get_cursor(&process("p")).unwrap().unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn cursor_upsert_overwrites() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        store.put_cursor(&process("p"), &cursor(100, 100, true)).unwrap();
        store.put_cursor(&process("p"), &cursor(200, 180, false)).unwrap();

        let read = store.get_cursor(&process("p")).unwrap().unwrap();
        assert_eq!(read.offset, 200);
        assert_eq!(read.total_processed, 180);
        assert!(!read.has_more_data);
    }

    #[test]
    fn different_processes_independent() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        store.put_cursor(&process("a"), &cursor(100, 100, true)).unwrap();
        store.put_cursor(&process("b"), &cursor(900, 850, false)).unwrap();

        assert_eq!(store.get_cursor(&process("a")).unwrap().unwrap().offset, 100);
        assert_eq!(store.get_cursor(&process("b")).unwrap().unwrap().offset, 900);
    }

    #[test]
    fn corrupt_source_is_reported() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        {
            let conn = store.lock_conn().unwrap();
            conn.execute(
                "INSERT INTO etl_state (process_name, source, last_updated) VALUES ('p', 'nope', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }
        let err = store.get_cursor(&process("p")).unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }), "got: {err}");
    }

    #[test]
    fn cursor_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.db");
        {
            let store = SqliteCheckpointStore::open(&path).unwrap();
            store.put_cursor(&process("p"), &cursor(500, 500, true)).unwrap();
        }
        let store = SqliteCheckpointStore::open(&path).unwrap();
        assert_eq!(store.get_cursor(&process("p")).unwrap().unwrap().offset, 500);
    }

    #[test]
    fn run_lifecycle() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        let run_id = store.start_run(&process("p")).unwrap();
        assert!(run_id > 0);

        store
            .complete_run(
                run_id,
                RunStatus::Completed,
                &RunStats {
                    records_read: 1000,
                    records_written: 990,
                    validation_warnings: 3,
                    error_message: None,
                },
            )
            .unwrap();

        let (status, records_read, finished, _error) = store.get_run_row(run_id).unwrap();
        assert_eq!(status, "completed");
        assert_eq!(records_read, 1000);
        assert!(finished.is_some());
    }

    #[test]
    fn run_failure_keeps_message() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        let run_id = store.start_run(&process("p")).unwrap();
        store
            .complete_run(
                run_id,
                RunStatus::Failed,
                &RunStats {
                    error_message: Some("connection reset".into()),
                    ..RunStats::default()
                },
            )
            .unwrap();

        let (status, _records, _finished, error_msg) = store.get_run_row(run_id).unwrap();
        assert_eq!(status, "failed");
        assert_eq!(error_msg, Some("connection reset".into()));
    }

    #[test]
    fn multiple_runs_get_increasing_ids() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        let run1 = store.start_run(&process("p")).unwrap();
        let run2 = store.start_run(&process("p")).unwrap();
        assert!(run2 > run1);
    }

    fn quarantined(record_id: &str) -> QuarantinedRecord {
        QuarantinedRecord {
            record_id: record_id.into(),
            source_system: SourceSystem::Smarthr,
            record_json: r#"{"employee_id":null}"#.into(),
            errors: "Required field employee_id is missing".into(),
            quarantined_at: "2026-02-21T12:00:00.000Z".into(),
        }
    }

    #[test]
    fn quarantine_insert_and_count() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        let run_id = store.start_run(&process("p")).unwrap();

        let count = store
            .insert_quarantined(&process("p"), run_id, &[quarantined("a"), quarantined("b")])
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.count_quarantined_for_run(&process("p"), run_id).unwrap(), 2);
    }

    #[test]
    fn quarantine_empty_insert() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        assert_eq!(store.insert_quarantined(&process("p"), 1, &[]).unwrap(), 0);
    }

    #[test]
    fn quarantine_invalid_run_id_includes_operation_context() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        let err = store
            .insert_quarantined(&process("p"), 999, &[quarantined("a")])
            .expect_err("invalid run id should fail");
        assert!(err.to_string().contains("insert_quarantined"), "got: {err}");
    }

    #[test]
    fn alerts_are_appended() {
        let store = SqliteCheckpointStore::in_memory().unwrap();
        let report = QualityReport::new(
            "2026-03-01T06:00:00Z".parse().unwrap(),
            vec![
                Alert {
                    kind: AlertKind::DataCompleteness,
                    severity: Severity::Error,
                    message: "jobcan employee ID completeness is 50%".into(),
                    source_system: Some(SourceSystem::Jobcan),
                    metric_value: Some(50.0),
                },
                Alert {
                    kind: AlertKind::DuplicateRecords,
                    severity: Severity::Warning,
                    message: "12.50% of records are duplicates".into(),
                    source_system: None,
                    metric_value: Some(12.5),
                },
            ],
        );

        assert_eq!(store.append_alerts(&report).unwrap(), 2);
        assert_eq!(store.append_alerts(&report).unwrap(), 2);

        let rows = store.alert_rows().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].0, "data_completeness");
        assert_eq!(rows[0].1, "error");
        assert_eq!(rows[0].2.as_deref(), Some("jobcan"));
        assert_eq!(rows[1].2, None);
        assert_eq!(rows[1].3, Some(12.5));
    }
}
