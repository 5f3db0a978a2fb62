//! Quarantine persistence for records that fail validation.

use chrono::{SecondsFormat, Utc};
use hrsync_state::{CheckpointStore, StateError};
use hrsync_types::{ProcessName, QuarantinedRecord};

use crate::transform::TransformedRecord;

/// Build the quarantine entry for an invalid transformed record.
pub(crate) fn to_quarantined(transformed: &TransformedRecord) -> QuarantinedRecord {
    let record = &transformed.record;
    QuarantinedRecord {
        record_id: record.record_id.clone(),
        source_system: record.source_system,
        record_json: serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string()),
        errors: transformed.validation.errors.join("; "),
        quarantined_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Persist quarantined records and return how many were stored.
///
/// A failure is logged and returned; the caller must not advance the
/// cursor past records that were neither loaded nor quarantined.
pub(crate) fn persist_quarantined(
    store: &dyn CheckpointStore,
    process: &ProcessName,
    run_id: i64,
    records: &[QuarantinedRecord],
) -> Result<u64, StateError> {
    if records.is_empty() {
        return Ok(0);
    }

    let quarantine_count = records.len();

    match store.insert_quarantined(process, run_id, records) {
        Ok(inserted) => {
            tracing::info!(
                process = process.as_str(),
                quarantined = inserted,
                "Persisted quarantined records"
            );
            Ok(inserted)
        }
        Err(e) => {
            tracing::error!(
                process = process.as_str(),
                quarantine_count,
                error = %e,
                "Failed to persist quarantined records"
            );
            Err(e)
        }
    }
}
