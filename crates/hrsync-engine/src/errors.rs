//! Pipeline error model.

use hrsync_state::StateError;
use hrsync_types::ConnectorError;
use hrsync_warehouse::WarehouseError;

/// Load-protocol step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    EnsureTarget,
    CreateStaging,
    BulkInsert,
    MergeUpsert,
}

impl std::fmt::Display for LoadStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::EnsureTarget => "ensure target table",
            Self::CreateStaging => "create staging table",
            Self::BulkInsert => "bulk insert",
            Self::MergeUpsert => "merge upsert",
        })
    }
}

/// A batch failed to load. Batches before it stay committed.
#[derive(Debug, thiserror::Error)]
#[error(
    "load failed at batch {batch_index} during {step} \
     ({batches_committed} batches, {rows_committed} rows committed before failure): {source}"
)]
pub struct LoadError {
    pub step: LoadStep,
    pub batch_index: usize,
    pub batches_committed: usize,
    pub rows_committed: u64,
    #[source]
    pub source: WarehouseError,
}

/// Categorized pipeline failure.
///
/// `Fetch` and `Load` abort the current invocation after the stage's own
/// cleanup. `Configuration` is raised before any I/O.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Connector failed to deliver a page (network, timeout, bad response).
    #[error("fetch failed: {0}")]
    Fetch(#[from] ConnectorError),

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Unknown source or target, missing mapping or connector.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("checkpoint store error: {0}")]
    State(#[from] StateError),
}

impl PipelineError {
    /// Whether a later invocation can reasonably succeed without operator action.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(e) => e.retryable,
            Self::Load(e) => matches!(
                e.source,
                WarehouseError::Sqlite { .. } | WarehouseError::Io(_) | WarehouseError::Open(_)
            ),
            Self::Configuration(_) | Self::State(_) => false,
        }
    }

    /// Returns the typed connector error if this is a `Fetch` variant.
    #[must_use]
    pub fn as_connector_error(&self) -> Option<&ConnectorError> {
        match self {
            Self::Fetch(e) => Some(e),
            _ => None,
        }
    }
}
