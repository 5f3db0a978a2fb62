//! Checkpointed, bounded pagination over one source.
//!
//! A run moves `Idle -> Fetching -> {Exhausted | Capped}`. Pages are
//! fetched one at a time from the persisted offset; the resulting cursor
//! is returned to the caller and written only by [`commit_cursor`], so a
//! failure anywhere before that leaves the old cursor in place.

use std::time::Duration;

use chrono::Utc;
use hrsync_state::{CheckpointStore, StateError};
use hrsync_types::{ConnectorError, ExtractionCursor, ProcessName, RawRecord};

use crate::connector::{PageRequest, SourceConnector};

/// Per-run bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    pub page_size: u32,
    pub max_records_per_run: u32,
    pub fetch_timeout: Duration,
}

impl ExtractionLimits {
    /// Maximum pages fetched in one run. At least one page whenever
    /// `page_size` is non-zero.
    #[must_use]
    pub fn page_cap(&self) -> u32 {
        if self.page_size == 0 {
            0
        } else {
            (self.max_records_per_run / self.page_size).max(1)
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionEnd {
    /// Cursor already said no more data; nothing was fetched.
    AlreadyExhausted,
    /// An empty page or a false continuation flag ended the run.
    Exhausted,
    /// The page cap was reached while the connector still reported more.
    Capped,
}

/// Records pulled in one run plus the cursor to persist once they land.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<RawRecord>,
    pub previous: ExtractionCursor,
    pub next_cursor: ExtractionCursor,
    pub pages_fetched: u32,
    pub end: ExtractionEnd,
}

impl Extraction {
    /// Whether the cursor needs writing at all.
    #[must_use]
    pub fn cursor_changed(&self) -> bool {
        self.end != ExtractionEnd::AlreadyExhausted
    }
}

/// Run one bounded extraction from `cursor`.
///
/// # Errors
///
/// Returns the connector's error, or a `timeout` error when a page takes
/// longer than `limits.fetch_timeout`. No retries are attempted.
pub async fn extract(
    connector: &dyn SourceConnector,
    cursor: &ExtractionCursor,
    limits: &ExtractionLimits,
) -> Result<Extraction, ConnectorError> {
    let source = connector.system();

    if !cursor.has_more_data {
        tracing::info!(
            source = source.as_str(),
            offset = cursor.offset,
            "No more data to extract; reset the cursor to start over"
        );
        return Ok(Extraction {
            records: Vec::new(),
            previous: cursor.clone(),
            next_cursor: cursor.clone(),
            pages_fetched: 0,
            end: ExtractionEnd::AlreadyExhausted,
        });
    }

    if limits.page_size == 0 {
        return Err(ConnectorError::config(
            "INVALID_PAGE_SIZE",
            "page_size must be > 0",
        ));
    }

    let cap = limits.page_cap();
    let mut offset = cursor.offset;
    let mut total = cursor.total_processed;
    let mut records = Vec::new();
    let mut pages_fetched = 0u32;

    let (has_more_data, end) = loop {
        if pages_fetched >= cap {
            break (true, ExtractionEnd::Capped);
        }

        let request = PageRequest {
            offset,
            limit: limits.page_size,
        };
        let page = tokio::time::timeout(limits.fetch_timeout, connector.fetch_page(&request))
            .await
            .map_err(|_| {
                ConnectorError::timeout(
                    "FETCH_TIMEOUT",
                    format!(
                        "page at offset {offset} not returned within {}s",
                        limits.fetch_timeout.as_secs()
                    ),
                )
            })??;

        if page.records.is_empty() {
            tracing::info!(source = source.as_str(), offset, "Empty page; source exhausted");
            break (false, ExtractionEnd::Exhausted);
        }

        pages_fetched += 1;
        offset += u64::from(limits.page_size);
        total += page.records.len() as u64;
        tracing::debug!(
            source = source.as_str(),
            page = pages_fetched,
            returned = page.records.len(),
            has_next = page.has_next,
            "Fetched page"
        );
        records.extend(page.records);

        if !page.has_next {
            break (false, ExtractionEnd::Exhausted);
        }
    };

    tracing::info!(
        source = source.as_str(),
        pages = pages_fetched,
        records = records.len(),
        next_offset = offset,
        has_more_data,
        "Extraction run finished"
    );

    Ok(Extraction {
        records,
        previous: cursor.clone(),
        next_cursor: ExtractionCursor {
            source,
            offset,
            total_processed: total,
            has_more_data,
            last_updated: Utc::now(),
        },
        pages_fetched,
        end,
    })
}

/// Persist the cursor produced by `extraction`. Call only after its
/// records are durably loaded.
///
/// # Errors
///
/// Returns [`StateError`] if the store write fails.
pub fn commit_cursor(
    store: &dyn CheckpointStore,
    process: &ProcessName,
    extraction: &Extraction,
) -> Result<bool, StateError> {
    if !extraction.cursor_changed() {
        return Ok(false);
    }
    store.put_cursor(process, &extraction.next_cursor)?;
    tracing::info!(
        process = process.as_str(),
        offset = extraction.next_cursor.offset,
        total_processed = extraction.next_cursor.total_processed,
        has_more_data = extraction.next_cursor.has_more_data,
        "Cursor advanced"
    );
    Ok(true)
}

/// Reset a process's cursor to offset 0 with more data expected.
///
/// # Errors
///
/// Returns [`StateError`] if the store write fails.
pub fn reset_cursor(
    store: &dyn CheckpointStore,
    process: &ProcessName,
    source: hrsync_types::SourceSystem,
) -> Result<ExtractionCursor, StateError> {
    let cursor = ExtractionCursor::reset(source);
    store.put_cursor(process, &cursor)?;
    tracing::info!(process = process.as_str(), "Cursor reset");
    Ok(cursor)
}
