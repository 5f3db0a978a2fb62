//! Quality assessment alerts and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    DataFreshness,
    DataCompleteness,
    DataValidity,
    DuplicateRecords,
}

impl AlertKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataFreshness => "data_freshness",
            Self::DataCompleteness => "data_completeness",
            Self::DataValidity => "data_validity",
            Self::DuplicateRecords => "duplicate_records",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single threshold breach raised by quality assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_system: Option<SourceSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_value: Option<f64>,
}

/// Snapshot produced by one quality assessment run. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub timestamp: DateTime<Utc>,
    pub alerts_count: usize,
    pub alerts: Vec<Alert>,
}

impl QualityReport {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, alerts: Vec<Alert>) -> Self {
        Self {
            timestamp,
            alerts_count: alerts.len(),
            alerts,
        }
    }

    /// Number of alerts at the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_serializes_kind_as_type() {
        let alert = Alert {
            kind: AlertKind::DataValidity,
            severity: Severity::Warning,
            message: "garoon email validity is 90%".into(),
            source_system: Some(SourceSystem::Garoon),
            metric_value: Some(90.0),
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "data_validity");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["source_system"], "garoon");
    }

    #[test]
    fn report_counts_by_severity() {
        let mk = |severity| Alert {
            kind: AlertKind::DataCompleteness,
            severity,
            message: String::new(),
            source_system: None,
            metric_value: None,
        };
        let report = QualityReport::new(
            Utc::now(),
            vec![mk(Severity::Error), mk(Severity::Warning), mk(Severity::Warning)],
        );
        assert_eq!(report.alerts_count, 3);
        assert_eq!(report.count(Severity::Error), 1);
        assert_eq!(report.count(Severity::Warning), 2);
    }
}
