//! Trigger result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

/// Record counts for one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCounts {
    /// Raw records returned by the connector this run.
    pub records_processed: u64,
    /// Rows upserted into the target table.
    pub records_inserted: u64,
    pub validation_warnings: u64,
    pub records_quarantined: u64,
    /// Records dropped at load for lack of an identity key.
    pub records_skipped: u64,
}

/// Structured answer to every trigger request.
///
/// `has_more_data` tells the caller whether re-invoking is worthwhile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: SyncStatus,
    pub message: String,
    pub records_processed: u64,
    pub records_inserted: u64,
    pub total_processed: u64,
    pub has_more_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
    #[serde(default)]
    pub validation_warnings: u64,
    #[serde(default)]
    pub records_quarantined: u64,
    #[serde(default)]
    pub records_skipped: u64,
    pub timestamp: DateTime<Utc>,
}

impl SyncResponse {
    /// A success with no records moved (reset, connection test, exhausted cursor).
    #[must_use]
    pub fn ok(message: impl Into<String>, total_processed: u64, has_more_data: bool) -> Self {
        Self {
            status: SyncStatus::Success,
            message: message.into(),
            records_processed: 0,
            records_inserted: 0,
            total_processed,
            has_more_data,
            next_offset: None,
            validation_warnings: 0,
            records_quarantined: 0,
            records_skipped: 0,
            timestamp: Utc::now(),
        }
    }

    /// A completed sync run.
    #[must_use]
    pub fn completed(
        counts: &SyncCounts,
        total_processed: u64,
        has_more_data: bool,
        next_offset: u64,
    ) -> Self {
        Self {
            status: SyncStatus::Success,
            message: format!(
                "Processed {} records, upserted {}",
                counts.records_processed, counts.records_inserted
            ),
            records_processed: counts.records_processed,
            records_inserted: counts.records_inserted,
            total_processed,
            has_more_data,
            next_offset: Some(next_offset),
            validation_warnings: counts.validation_warnings,
            records_quarantined: counts.records_quarantined,
            records_skipped: counts.records_skipped,
            timestamp: Utc::now(),
        }
    }

    /// A failed invocation. `has_more_data` mirrors whether a retry could help.
    #[must_use]
    pub fn failed(err: &PipelineError, counts: &SyncCounts, total_processed: u64) -> Self {
        Self {
            status: SyncStatus::Error,
            message: err.to_string(),
            records_processed: counts.records_processed,
            records_inserted: counts.records_inserted,
            total_processed,
            has_more_data: err.is_transient(),
            next_offset: None,
            validation_warnings: counts.validation_warnings,
            records_quarantined: counts.records_quarantined,
            records_skipped: counts.records_skipped,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }
}
