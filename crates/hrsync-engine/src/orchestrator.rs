//! Trigger handling: one request, one bounded sync run.

use std::collections::BTreeMap;
use std::sync::Arc;

use hrsync_state::CheckpointStore;
use hrsync_types::{ExtractionCursor, ProcessName, RunStats, RunStatus, SourceSystem, UnifiedRecord};
use hrsync_warehouse::{TableSchema, Warehouse};
use serde::{Deserialize, Serialize};

use crate::config::types::{ConnectorConfig, InvalidRecordPolicy, PipelineConfig};
use crate::connector::{ConnectorRegistry, FileFeedConnector, SourceConnector};
use crate::errors::PipelineError;
use crate::extract::{commit_cursor, extract, reset_cursor, Extraction, ExtractionLimits};
use crate::load::{load_records, LoadTarget};
use crate::merge::{merge_duplicates, MergePolicy};
use crate::quality::assess_data_quality;
use crate::quarantine::{persist_quarantined, to_quarantined};
use crate::result::{SyncCounts, SyncResponse};
use crate::transform::{TransformedRecord, Transformer};

/// A trigger request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub source: String,
    #[serde(default)]
    pub target: String,
    /// Only check the connector.
    #[serde(default)]
    pub test: bool,
    /// Reset the source's cursor and return without extracting.
    #[serde(default)]
    pub reset: bool,
}

impl SyncRequest {
    #[must_use]
    pub fn run(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            test: false,
            reset: false,
        }
    }
}

/// Counters that survive a failure so the error response can report them.
#[derive(Debug, Default)]
struct RunContext {
    counts: SyncCounts,
    total_processed: u64,
}

/// Runs sync requests against explicitly passed collaborators.
pub struct Pipeline {
    store: Arc<dyn CheckpointStore>,
    warehouse: Arc<dyn Warehouse>,
    connectors: ConnectorRegistry,
    targets: BTreeMap<String, String>,
    schema: TableSchema,
    limits: ExtractionLimits,
    batch_size: usize,
    on_invalid: InvalidRecordPolicy,
    transformer: Transformer,
    merge_policy: MergePolicy,
}

impl Pipeline {
    /// Build a pipeline with the given connectors.
    #[must_use]
    pub fn new(
        config: &PipelineConfig,
        store: Arc<dyn CheckpointStore>,
        warehouse: Arc<dyn Warehouse>,
        connectors: ConnectorRegistry,
    ) -> Self {
        Self {
            store,
            warehouse,
            connectors,
            targets: config
                .targets
                .iter()
                .map(|(name, t)| (name.clone(), t.table.clone()))
                .collect(),
            schema: TableSchema::employees_unified(),
            limits: ExtractionLimits {
                page_size: config.extraction.page_size,
                max_records_per_run: config.extraction.max_records_per_run,
                fetch_timeout: config.extraction.fetch_timeout(),
            },
            batch_size: config.load.batch_size,
            on_invalid: config.validation.on_invalid,
            transformer: Transformer::default(),
            merge_policy: MergePolicy::default(),
        }
    }

    /// Build a pipeline whose connectors come from the config's `sources`.
    #[must_use]
    pub fn from_config(
        config: &PipelineConfig,
        store: Arc<dyn CheckpointStore>,
        warehouse: Arc<dyn Warehouse>,
    ) -> Self {
        Self::new(config, store, warehouse, connectors_from_config(config))
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    #[must_use]
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Handle one trigger request. Always returns a structured response.
    pub async fn handle(&self, request: &SyncRequest) -> SyncResponse {
        let mut ctx = RunContext::default();
        match self.dispatch(request, &mut ctx).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    source = request.source.as_str(),
                    target = request.target.as_str(),
                    transient = err.is_transient(),
                    error = %err,
                    "Sync request failed"
                );
                SyncResponse::failed(&err, &ctx.counts, ctx.total_processed)
            }
        }
    }

    async fn dispatch(
        &self,
        request: &SyncRequest,
        ctx: &mut RunContext,
    ) -> Result<SyncResponse, PipelineError> {
        let source: SourceSystem = request
            .source
            .parse()
            .map_err(|e| PipelineError::Configuration(format!("{e}")))?;
        let process = ProcessName::for_source(source);

        if request.reset {
            reset_cursor(self.store.as_ref(), &process, source)?;
            return Ok(SyncResponse::ok(
                format!("Reset extraction cursor for {source}"),
                0,
                true,
            ));
        }

        let connector = self.connectors.get(source).ok_or_else(|| {
            PipelineError::Configuration(format!("no connector configured for source '{source}'"))
        })?;

        if request.test {
            return Self::test_connection(connector.as_ref()).await;
        }

        let table = self.targets.get(&request.target).ok_or_else(|| {
            PipelineError::Configuration(format!("unknown target '{}'", request.target))
        })?;

        self.sync(connector.as_ref(), &process, table, ctx).await
    }

    async fn test_connection(connector: &dyn SourceConnector) -> Result<SyncResponse, PipelineError> {
        let source = connector.system();
        if connector.test_connection().await? {
            tracing::info!(source = source.as_str(), "Connection test passed");
            Ok(SyncResponse::ok(format!("Connection to {source} succeeded"), 0, false))
        } else {
            Err(PipelineError::Fetch(hrsync_types::ConnectorError::auth(
                "CONNECTION_TEST_FAILED",
                format!("connection test for {source} failed"),
            )))
        }
    }

    async fn sync(
        &self,
        connector: &dyn SourceConnector,
        process: &ProcessName,
        table: &str,
        ctx: &mut RunContext,
    ) -> Result<SyncResponse, PipelineError> {
        let source = connector.system();
        let cursor = self
            .store
            .get_cursor(process)?
            .unwrap_or_else(|| ExtractionCursor::initial(source));
        ctx.total_processed = cursor.total_processed;

        let run_id = self.store.start_run(process)?;
        tracing::info!(
            process = process.as_str(),
            run_id,
            offset = cursor.offset,
            has_more_data = cursor.has_more_data,
            "Starting sync run"
        );

        match self.execute(connector, process, &cursor, table, run_id, ctx).await {
            Ok(extraction) => {
                self.finish_run(run_id, RunStatus::Completed, &ctx.counts, None);
                let next = &extraction.next_cursor;
                if extraction.cursor_changed() {
                    ctx.total_processed = next.total_processed;
                    Ok(SyncResponse::completed(
                        &ctx.counts,
                        next.total_processed,
                        next.has_more_data,
                        next.offset,
                    ))
                } else {
                    let mut response = SyncResponse::ok(
                        format!("No more data to process for {source}"),
                        next.total_processed,
                        false,
                    );
                    response.next_offset = Some(next.offset);
                    Ok(response)
                }
            }
            Err(err) => {
                self.finish_run(run_id, RunStatus::Failed, &ctx.counts, Some(err.to_string()));
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        connector: &dyn SourceConnector,
        process: &ProcessName,
        cursor: &ExtractionCursor,
        table: &str,
        run_id: i64,
        ctx: &mut RunContext,
    ) -> Result<Extraction, PipelineError> {
        let source = connector.system();
        let extraction = extract(connector, cursor, &self.limits).await?;
        ctx.counts.records_processed = extraction.records.len() as u64;

        if extraction.records.is_empty() {
            commit_cursor(self.store.as_ref(), process, &extraction)?;
            return Ok(extraction);
        }

        let transformed = self.transformer.transform(&extraction.records, source);
        self.log_batch_quality(source, &transformed);

        let records = self.screen(process, run_id, transformed, ctx)?;
        let before_merge = records.len();
        let merged = merge_duplicates(records, &self.merge_policy);
        if merged.len() < before_merge {
            tracing::info!(
                source = source.as_str(),
                before = before_merge,
                after = merged.len(),
                "Merged duplicate records"
            );
        }

        let run_token = uuid::Uuid::new_v4().simple().to_string();
        let summary = load_records(
            self.warehouse.as_ref(),
            LoadTarget {
                table,
                schema: &self.schema,
                batch_size: self.batch_size,
            },
            &merged,
            &run_token[..8],
        )
        .await
        .map_err(|e| {
            ctx.counts.records_inserted = e.rows_committed;
            PipelineError::from(e)
        })?;
        ctx.counts.records_inserted = summary.rows_written;
        ctx.counts.records_skipped = summary.records_skipped;

        commit_cursor(self.store.as_ref(), process, &extraction)?;
        Ok(extraction)
    }

    /// Count validation warnings and divert invalid records when quarantining.
    ///
    /// A failed quarantine write fails the run so the cursor stays behind
    /// the diverted records.
    fn screen(
        &self,
        process: &ProcessName,
        run_id: i64,
        transformed: Vec<TransformedRecord>,
        ctx: &mut RunContext,
    ) -> Result<Vec<UnifiedRecord>, PipelineError> {
        ctx.counts.validation_warnings =
            transformed.iter().filter(|t| !t.validation.is_valid).count() as u64;

        match self.on_invalid {
            InvalidRecordPolicy::Warn => Ok(transformed.into_iter().map(|t| t.record).collect()),
            InvalidRecordPolicy::Quarantine => {
                let (valid, invalid): (Vec<_>, Vec<_>) =
                    transformed.into_iter().partition(|t| t.validation.is_valid);
                let quarantined: Vec<_> = invalid.iter().map(to_quarantined).collect();
                ctx.counts.records_quarantined =
                    persist_quarantined(self.store.as_ref(), process, run_id, &quarantined)?;
                Ok(valid.into_iter().map(|t| t.record).collect())
            }
        }
    }

    fn log_batch_quality(&self, source: SourceSystem, transformed: &[TransformedRecord]) {
        let rows: Vec<_> = transformed.iter().map(|t| t.record.to_row()).collect();
        let quality = assess_data_quality(&rows, self.transformer.rules());
        tracing::info!(
            source = source.as_str(),
            total_records = quality.total_records,
            completeness_score = quality.completeness_score,
            validity_score = quality.validity_score,
            duplicate_count = quality.duplicate_count,
            "Batch data quality"
        );
    }

    fn finish_run(&self, run_id: i64, status: RunStatus, counts: &SyncCounts, error: Option<String>) {
        let stats = RunStats {
            records_read: counts.records_processed,
            records_written: counts.records_inserted,
            validation_warnings: counts.validation_warnings,
            error_message: error,
        };
        if let Err(e) = self.store.complete_run(run_id, status, &stats) {
            tracing::error!(run_id, error = %e, "Failed to record run completion");
        }
    }
}

/// One [`FileFeedConnector`] per configured source.
#[must_use]
pub fn connectors_from_config(config: &PipelineConfig) -> ConnectorRegistry {
    let mut registry = ConnectorRegistry::new();
    for source in &config.sources {
        match &source.connector {
            ConnectorConfig::File { path } => {
                registry.register(Arc::new(FileFeedConnector::new(source.system, path.clone())));
            }
        }
    }
    registry
}
