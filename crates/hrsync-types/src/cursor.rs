//! Per-source extraction cursor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceSystem;

/// Persisted resumption state for one source system.
///
/// `offset` never decreases across successful runs. Once `has_more_data`
/// is `false` no extraction proceeds until [`ExtractionCursor::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCursor {
    pub source: SourceSystem,
    pub offset: u64,
    pub total_processed: u64,
    pub has_more_data: bool,
    pub last_updated: DateTime<Utc>,
}

impl ExtractionCursor {
    /// Zeroed cursor used the first time a source is extracted.
    #[must_use]
    pub fn initial(source: SourceSystem) -> Self {
        Self {
            source,
            offset: 0,
            total_processed: 0,
            has_more_data: true,
            last_updated: Utc::now(),
        }
    }

    /// Cursor state after an explicit reset, regardless of prior state.
    #[must_use]
    pub fn reset(source: SourceSystem) -> Self {
        Self::initial(source)
    }

    /// Whether an extraction attempt is allowed to fetch at all.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        !self.has_more_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_zeroes_everything() {
        let cursor = ExtractionCursor::reset(SourceSystem::Jobcan);
        assert_eq!(cursor.offset, 0);
        assert_eq!(cursor.total_processed, 0);
        assert!(cursor.has_more_data);
        assert!(!cursor.is_exhausted());
    }

    #[test]
    fn serde_roundtrip() {
        let cursor = ExtractionCursor {
            source: SourceSystem::Garoon,
            offset: 1000,
            total_processed: 987,
            has_more_data: false,
            last_updated: "2026-01-15T10:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_string(&cursor).unwrap();
        let back: ExtractionCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(cursor, back);
        assert!(back.is_exhausted());
    }
}
