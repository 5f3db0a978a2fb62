//! Checkpoint store trait definition.
//!
//! [`CheckpointStore`] defines the storage contract for extraction cursors,
//! run history, quarantined records, and quality alerts. Model types live
//! in [`hrsync_types`].

use hrsync_types::{ExtractionCursor, ProcessName, QualityReport, QuarantinedRecord, RunStats, RunStatus};

use crate::error;

/// Storage contract for pipeline state.
///
/// Cursors are read-then-written without fencing: callers must run at most
/// one invocation per process name at a time.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn CheckpointStore>`.
pub trait CheckpointStore: Send + Sync {
    /// Read the persisted cursor for a process.
    ///
    /// Returns `Ok(None)` when no cursor has been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn get_cursor(&self, process: &ProcessName) -> error::Result<Option<ExtractionCursor>>;

    /// Upsert the cursor for a process.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn put_cursor(&self, process: &ProcessName, cursor: &ExtractionCursor) -> error::Result<()>;

    /// Begin a new sync run, returning its unique ID.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn start_run(&self, process: &ProcessName) -> error::Result<i64>;

    /// Finalize a sync run with status and aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()>;

    /// Persist records held back by validation. Returns the count inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn insert_quarantined(
        &self,
        process: &ProcessName,
        run_id: i64,
        records: &[QuarantinedRecord],
    ) -> error::Result<u64>;

    /// Append a quality report's alerts to the audit log. Returns the count inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn append_alerts(&self, report: &QualityReport) -> error::Result<u64>;
}
