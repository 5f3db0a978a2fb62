//! Checkpoint store model types.
//!
//! Pure data types used by `CheckpointStore` implementations. Kept in the
//! types crate so the engine and state crates can share them without
//! circular dependencies.

use serde::{Deserialize, Serialize};

use crate::source::SourceSystem;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Key under which a source's cursor and run history are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessName(String);

impl ProcessName {
    /// Create a process name from an arbitrary string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Canonical process name for a source's employee sync
    /// (e.g. `"smarthr_employee_sync"`).
    #[must_use]
    pub fn for_source(source: SourceSystem) -> Self {
        Self(format!("{}_employee_sync", source.as_str()))
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProcessName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SourceSystem> for ProcessName {
    fn from(value: SourceSystem) -> Self {
        Self::for_source(value)
    }
}

// ---------------------------------------------------------------------------
// Run tracking
// ---------------------------------------------------------------------------

/// Status of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate statistics for a finished sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub records_read: u64,
    pub records_written: u64,
    pub validation_warnings: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Quarantine
// ---------------------------------------------------------------------------

/// A transformed record held back from loading because it failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedRecord {
    pub record_id: String,
    pub source_system: SourceSystem,
    /// The transformed record, serialized as JSON.
    pub record_json: String,
    /// Validation errors, joined with `"; "`.
    pub errors: String,
    /// ISO-8601 UTC timestamp.
    pub quarantined_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_name_for_source() {
        let name = ProcessName::for_source(SourceSystem::Smarthr);
        assert_eq!(name.as_str(), "smarthr_employee_sync");
        assert_eq!(name.to_string(), "smarthr_employee_sync");
        assert_eq!(ProcessName::from(SourceSystem::Garoon), ProcessName::new("garoon_employee_sync"));
    }

    #[test]
    fn run_status_serde_matches_as_str() {
        for status in [RunStatus::Running, RunStatus::Completed, RunStatus::Failed] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn run_stats_default_is_zeroed() {
        let stats = RunStats::default();
        assert_eq!(stats.records_read, 0);
        assert_eq!(stats.records_written, 0);
        assert_eq!(stats.validation_warnings, 0);
        assert!(stats.error_message.is_none());
    }

    #[test]
    fn process_name_serde_transparent() {
        let json = serde_json::to_string(&ProcessName::new("x")).unwrap();
        assert_eq!(json, "\"x\"");
    }
}
