//! Source connector contract and the file feed connector.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hrsync_types::{ConnectorError, RawRecord, SourceSystem};
use serde_json::Value;

/// One page request: `limit` records starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u32,
}

/// One page of raw records plus the connector's continuation flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<RawRecord>,
    pub has_next: bool,
}

/// A paged source of raw records.
///
/// Authentication, base URL, and wire format stay inside the connector.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    fn system(&self) -> SourceSystem;

    /// Fetch one page.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectorError`] for network, auth, or payload failures.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, ConnectorError>;

    /// Check connectivity without extracting.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectorError`] when the check itself cannot run.
    async fn test_connection(&self) -> Result<bool, ConnectorError>;
}

/// Connectors keyed by source system.
#[derive(Default, Clone)]
pub struct ConnectorRegistry {
    connectors: HashMap<SourceSystem, Arc<dyn SourceConnector>>,
}

impl ConnectorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector under its own system, replacing any previous one.
    pub fn register(&mut self, connector: Arc<dyn SourceConnector>) {
        self.connectors.insert(connector.system(), connector);
    }

    #[must_use]
    pub fn get(&self, system: SourceSystem) -> Option<Arc<dyn SourceConnector>> {
        self.connectors.get(&system).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

/// Pages over a JSON export on disk.
///
/// The file holds either an array of objects or an object with a
/// `records` or `data` array. It is re-read on every call so edits
/// between runs are picked up.
#[derive(Debug, Clone)]
pub struct FileFeedConnector {
    system: SourceSystem,
    path: PathBuf,
}

impl FileFeedConnector {
    #[must_use]
    pub fn new(system: SourceSystem, path: impl Into<PathBuf>) -> Self {
        Self {
            system,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<RawRecord>, ConnectorError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            let msg = format!("{}: {e}", self.path.display());
            match e.kind() {
                std::io::ErrorKind::NotFound => ConnectorError::config("FEED_NOT_FOUND", msg),
                std::io::ErrorKind::PermissionDenied => ConnectorError::auth("FEED_FORBIDDEN", msg),
                _ => ConnectorError::transient_network("FEED_READ", msg),
            }
        })?;
        let doc: Value = serde_json::from_str(&content).map_err(|e| {
            ConnectorError::data("FEED_PARSE", format!("{}: {e}", self.path.display()))
        })?;

        let items = match doc {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("records").or_else(|| obj.remove("data")) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(ConnectorError::data(
                        "FEED_SHAPE",
                        "expected an array or an object with a 'records' or 'data' array",
                    ))
                }
            },
            _ => {
                return Err(ConnectorError::data(
                    "FEED_SHAPE",
                    "expected an array of objects",
                ))
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                _ => Err(ConnectorError::data(
                    "FEED_SHAPE",
                    format!("item {i} is not an object"),
                )),
            })
            .collect()
    }
}

#[async_trait]
impl SourceConnector for FileFeedConnector {
    fn system(&self) -> SourceSystem {
        self.system
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Page, ConnectorError> {
        let all = self.load()?;
        let start = usize::try_from(request.offset).unwrap_or(usize::MAX).min(all.len());
        let end = start.saturating_add(request.limit as usize).min(all.len());
        let records = all[start..end].to_vec();
        tracing::debug!(
            source = self.system.as_str(),
            offset = request.offset,
            returned = records.len(),
            "file feed page"
        );
        Ok(Page {
            records,
            has_next: end < all.len(),
        })
    }

    async fn test_connection(&self) -> Result<bool, ConnectorError> {
        match self.load() {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(source = self.system.as_str(), error = %e, "file feed check failed");
                Ok(false)
            }
        }
    }
}
