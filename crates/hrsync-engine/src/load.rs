//! Staging-table upsert load.
//!
//! Each batch runs the full protocol before the next begins:
//! ensure target, create staging, bulk insert into staging, one set-based
//! upsert into the target, drop staging. A failing batch is cleaned up and
//! reported; batches committed before it stay committed.

use hrsync_types::{UnifiedRecord, IDENTITY_KEY};
use hrsync_warehouse::{TableSchema, Warehouse, WarehouseError};

use crate::errors::{LoadError, LoadStep};

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub batches: usize,
    pub rows_written: u64,
    /// Records dropped because they carry no identity key.
    pub records_skipped: u64,
}

/// Where and how to load.
#[derive(Debug, Clone, Copy)]
pub struct LoadTarget<'a> {
    pub table: &'a str,
    pub schema: &'a TableSchema,
    pub batch_size: usize,
}

/// Name of the ephemeral staging table for one batch of one run.
#[must_use]
pub fn staging_table_name(table: &str, run_token: &str, batch_index: usize) -> String {
    format!("{table}__staging_{run_token}_{batch_index}")
}

async fn drop_staging(warehouse: &dyn Warehouse, staging: &str) {
    if let Err(e) = warehouse.drop_table(staging).await {
        tracing::error!(staging, error = %e, "Failed to drop staging table");
    }
}

/// Load `records` into `target.table` in batches of `target.batch_size`.
///
/// `run_token` makes staging names unique per run and must be a plain
/// identifier fragment.
///
/// # Errors
///
/// Returns [`LoadError`] for the first failing batch with the counts
/// committed before it.
pub async fn load_records(
    warehouse: &dyn Warehouse,
    target: LoadTarget<'_>,
    records: &[UnifiedRecord],
    run_token: &str,
) -> Result<LoadSummary, LoadError> {
    let (keyed, keyless): (Vec<&UnifiedRecord>, Vec<&UnifiedRecord>) =
        records.iter().partition(|r| r.identity().is_some());

    let mut summary = LoadSummary {
        records_skipped: keyless.len() as u64,
        ..LoadSummary::default()
    };
    if !keyless.is_empty() {
        tracing::warn!(
            table = target.table,
            skipped = keyless.len(),
            "Skipping records without an identity key"
        );
    }

    for (batch_index, batch) in keyed.chunks(target.batch_size.max(1)).enumerate() {
        let fail = |step: LoadStep, summary: &LoadSummary, source: WarehouseError| LoadError {
            step,
            batch_index,
            batches_committed: summary.batches,
            rows_committed: summary.rows_written,
            source,
        };

        warehouse
            .ensure_table(target.table, target.schema)
            .await
            .map_err(|e| fail(LoadStep::EnsureTarget, &summary, e))?;

        let staging = staging_table_name(target.table, run_token, batch_index);
        let rows: Vec<_> = batch.iter().map(|r| r.to_row()).collect();

        let written = match load_batch(warehouse, target, &staging, &rows).await {
            Ok(written) => written,
            Err((step, e)) => {
                drop_staging(warehouse, &staging).await;
                return Err(fail(step, &summary, e));
            }
        };
        drop_staging(warehouse, &staging).await;

        summary.batches += 1;
        summary.rows_written += written;
        tracing::info!(
            table = target.table,
            batch = batch_index,
            rows = written,
            "Batch upserted"
        );
    }

    Ok(summary)
}

async fn load_batch(
    warehouse: &dyn Warehouse,
    target: LoadTarget<'_>,
    staging: &str,
    rows: &[hrsync_types::Row],
) -> Result<u64, (LoadStep, WarehouseError)> {
    warehouse
        .ensure_table(staging, target.schema)
        .await
        .map_err(|e| (LoadStep::CreateStaging, e))?;
    warehouse
        .bulk_insert(staging, target.schema, rows)
        .await
        .map_err(|e| (LoadStep::BulkInsert, e))?;
    warehouse
        .merge_upsert(target.table, staging, target.schema, IDENTITY_KEY)
        .await
        .map_err(|e| (LoadStep::MergeUpsert, e))
}
