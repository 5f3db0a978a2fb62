//! Quality assessment over persisted records and in-flight batches.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hrsync_state::CheckpointStore;
use hrsync_types::{Alert, AlertKind, QualityReport, Row, Severity, SourceSystem, IDENTITY_KEY};
use hrsync_warehouse::{TableSchema, Warehouse, WarehouseError};
use serde::Serialize;

use crate::config::types::QualityConfig;
use crate::notifier::Notifier;
use crate::validation::{is_valid_email, RuleSet};

const PROCESSED_AT: &str = "processed_at";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn non_empty_str<'a>(row: &'a Row, field: &str) -> Option<&'a str> {
    row.get(field)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

fn processed_at(row: &Row) -> Option<DateTime<Utc>> {
    non_empty_str(row, PROCESSED_AT)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

fn source_of(row: &Row) -> Option<SourceSystem> {
    non_empty_str(row, "source_system").and_then(|s| s.parse().ok())
}

/// Rows grouped by source, in source order.
fn by_source(rows: &[Row]) -> BTreeMap<&'static str, (SourceSystem, Vec<&Row>)> {
    let mut groups: BTreeMap<&'static str, (SourceSystem, Vec<&Row>)> = BTreeMap::new();
    for row in rows {
        if let Some(source) = source_of(row) {
            groups
                .entry(source.as_str())
                .or_insert_with(|| (source, Vec::new()))
                .1
                .push(row);
        }
    }
    groups
}

/// One warning per source whose newest record is older than the threshold.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn freshness_alerts(rows: &[Row], now: DateTime<Utc>, threshold_hours: u32) -> Vec<Alert> {
    by_source(rows)
        .into_values()
        .filter_map(|(source, group)| {
            let newest = group.iter().filter_map(|r| processed_at(r)).max()?;
            let hours = (now - newest).num_hours();
            (hours > i64::from(threshold_hours)).then(|| Alert {
                kind: AlertKind::DataFreshness,
                severity: Severity::Warning,
                message: format!("{source} data is {hours} hours old"),
                source_system: Some(source),
                metric_value: Some(hours as f64),
            })
        })
        .collect()
}

/// Per-source completeness errors and email validity warnings.
#[must_use]
pub fn source_quality_alerts(rows: &[Row], config: &QualityConfig) -> Vec<Alert> {
    let mut alerts = Vec::new();
    for (source, group) in by_source(rows).into_values() {
        let total = group.len();
        let with_id = group.iter().filter(|r| non_empty_str(r, IDENTITY_KEY).is_some()).count();
        let valid_email = group
            .iter()
            .filter(|r| non_empty_str(r, "email").is_some_and(is_valid_email))
            .count();

        let completeness = round2(pct(with_id, total));
        let validity = round2(pct(valid_email, total));
        tracing::debug!(source = source.as_str(), total, completeness, validity, "Source quality");

        if completeness < config.completeness_pct {
            alerts.push(Alert {
                kind: AlertKind::DataCompleteness,
                severity: Severity::Error,
                message: format!("{source} employee ID completeness is {completeness}%"),
                source_system: Some(source),
                metric_value: Some(completeness),
            });
        }
        if validity < config.validity_pct {
            alerts.push(Alert {
                kind: AlertKind::DataValidity,
                severity: Severity::Warning,
                message: format!("{source} email validity is {validity}%"),
                source_system: Some(source),
                metric_value: Some(validity),
            });
        }
    }
    alerts
}

/// Percentage of distinct identity keys that occur more than once.
#[must_use]
pub fn duplicate_percentage(rows: &[Row]) -> f64 {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in rows.iter().filter_map(|r| non_empty_str(r, IDENTITY_KEY)) {
        *counts.entry(id).or_default() += 1;
    }
    let repeated = counts.values().filter(|&&n| n > 1).count();
    pct(repeated, counts.len())
}

#[must_use]
pub fn duplicate_alert(rows: &[Row], threshold_pct: f64) -> Option<Alert> {
    let percentage = duplicate_percentage(rows);
    (percentage > threshold_pct).then(|| Alert {
        kind: AlertKind::DuplicateRecords,
        severity: Severity::Warning,
        message: format!("{percentage:.2}% of records are duplicates"),
        source_system: None,
        metric_value: Some(round2(percentage)),
    })
}

/// Metrics for a set of records not yet loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchQuality {
    pub total_records: usize,
    /// Percentage of records with a non-null value, per field seen.
    pub field_completeness: BTreeMap<String, f64>,
    /// Mean of `field_completeness`.
    pub completeness_score: f64,
    /// Percentage of records passing validation.
    pub validity_score: f64,
    /// Identity keys minus distinct identity keys.
    pub duplicate_count: usize,
}

/// Assess a batch of rows.
#[must_use]
pub fn assess_data_quality(rows: &[Row], rules: &RuleSet) -> BatchQuality {
    let total = rows.len();
    let fields: HashSet<&str> = rows.iter().flat_map(|r| r.keys().map(String::as_str)).collect();

    let field_completeness: BTreeMap<String, f64> = fields
        .into_iter()
        .map(|field| {
            let present = rows
                .iter()
                .filter(|r| r.get(field).is_some_and(|v| !v.is_null()))
                .count();
            (field.to_string(), pct(present, total))
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let completeness_score = if field_completeness.is_empty() {
        0.0
    } else {
        field_completeness.values().sum::<f64>() / field_completeness.len() as f64
    };

    let valid = rows.iter().filter(|r| rules.validate(r).is_valid).count();

    let ids: Vec<&str> = rows.iter().filter_map(|r| non_empty_str(r, IDENTITY_KEY)).collect();
    let distinct: HashSet<&str> = ids.iter().copied().collect();

    BatchQuality {
        total_records: total,
        field_completeness,
        completeness_score,
        validity_score: pct(valid, total),
        duplicate_count: ids.len() - distinct.len(),
    }
}

/// Periodic quality pass over a warehouse table.
///
/// Alerts go to the notifier and the audit log; both are best-effort.
pub struct QualityMonitor {
    warehouse: Arc<dyn Warehouse>,
    store: Arc<dyn CheckpointStore>,
    notifier: Arc<dyn Notifier>,
    table: String,
    schema: TableSchema,
    config: QualityConfig,
}

impl QualityMonitor {
    #[must_use]
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        store: Arc<dyn CheckpointStore>,
        notifier: Arc<dyn Notifier>,
        table: impl Into<String>,
        config: QualityConfig,
    ) -> Self {
        Self {
            warehouse,
            store,
            notifier,
            table: table.into(),
            schema: TableSchema::employees_unified(),
            config,
        }
    }

    /// Run every check as of now.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] if the table cannot be read.
    pub async fn assess(&self) -> Result<QualityReport, WarehouseError> {
        self.assess_at(Utc::now()).await
    }

    /// Run every check as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] if the table cannot be read.
    pub async fn assess_at(&self, now: DateTime<Utc>) -> Result<QualityReport, WarehouseError> {
        let lookback = now - Duration::days(i64::from(self.config.freshness_lookback_days));
        let window = now - Duration::hours(i64::from(self.config.window_hours));

        let history = self
            .warehouse
            .scan_since(&self.table, &self.schema, PROCESSED_AT, lookback)
            .await?;
        let recent: Vec<Row> = if window <= lookback {
            history.clone()
        } else {
            history
                .iter()
                .filter(|r| processed_at(r).is_some_and(|ts| ts >= window))
                .cloned()
                .collect()
        };

        let mut alerts = freshness_alerts(&history, now, self.config.freshness_hours);
        alerts.extend(source_quality_alerts(&recent, &self.config));
        alerts.extend(duplicate_alert(&recent, self.config.duplicate_pct));

        let report = QualityReport::new(now, alerts);
        tracing::info!(
            table = self.table.as_str(),
            scanned = history.len(),
            in_window = recent.len(),
            alerts = report.alerts_count,
            "Quality assessment finished"
        );

        if !report.alerts.is_empty() {
            if let Err(e) = self.notifier.send(&report.alerts).await {
                tracing::error!(error = %e, "Failed to deliver quality alerts");
            }
            if let Err(e) = self.store.append_alerts(&report) {
                tracing::error!(error = %e, "Failed to record quality alerts");
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use hrsync_state::{CheckpointStore, SqliteCheckpointStore, StateError};
    use hrsync_types::{ExtractionCursor, ProcessName, QuarantinedRecord, RunStats, RunStatus, UnifiedRecord};
    use hrsync_warehouse::SqliteWarehouse;
    use serde_json::json;

    use crate::notifier::{LogNotifier, NotifyError};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn row(source: &str, id: Option<&str>, email: Option<&str>, at: &str) -> Row {
        let mut r = Row::new();
        r.insert("source_system".into(), json!(source));
        r.insert(IDENTITY_KEY.into(), json!(id));
        r.insert("email".into(), json!(email));
        r.insert(PROCESSED_AT.into(), json!(at));
        r
    }

    #[test]
    fn stale_source_raises_freshness_warning() {
        let rows = vec![
            row("garoon", Some("E1"), None, "2026-03-01T00:00:00Z"),
            row("garoon", Some("E2"), None, "2026-03-02T00:00:00Z"),
            row("smarthr", Some("E3"), None, "2026-03-03T10:00:00Z"),
        ];
        let alerts = freshness_alerts(&rows, ts("2026-03-03T12:30:00Z"), 24);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "garoon data is 36 hours old");
        assert_eq!(alerts[0].source_system, Some(SourceSystem::Garoon));
        assert_eq!(alerts[0].metric_value, Some(36.0));
    }

    #[test]
    fn completeness_and_validity_per_source() {
        let rows = vec![
            row("pca", Some("P1"), Some("a@x.jp"), "2026-03-03T00:00:00Z"),
            row("pca", None, Some("b@x.jp"), "2026-03-03T00:00:00Z"),
            row("pca", Some(""), Some("broken"), "2026-03-03T00:00:00Z"),
            row("jobcan", Some("J1"), Some("j@x.jp"), "2026-03-03T00:00:00Z"),
        ];
        let alerts = source_quality_alerts(&rows, &QualityConfig::default());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::DataCompleteness);
        assert_eq!(alerts[0].severity, Severity::Error);
        assert_eq!(alerts[0].message, "pca employee ID completeness is 33.33%");
        assert_eq!(alerts[0].metric_value, Some(33.33));
        assert_eq!(alerts[1].kind, AlertKind::DataValidity);
        assert_eq!(alerts[1].message, "pca email validity is 66.67%");
    }

    #[test]
    fn duplicates_are_global() {
        let rows = vec![
            row("garoon", Some("E1"), None, "2026-03-03T00:00:00Z"),
            row("smarthr", Some("E1"), None, "2026-03-03T00:00:00Z"),
            row("garoon", Some("E2"), None, "2026-03-03T00:00:00Z"),
            row("garoon", Some("E3"), None, "2026-03-03T00:00:00Z"),
            row("garoon", None, None, "2026-03-03T00:00:00Z"),
        ];
        assert!((duplicate_percentage(&rows) - 100.0 / 3.0).abs() < 1e-9);
        let alert = duplicate_alert(&rows, 5.0).unwrap();
        assert_eq!(alert.message, "33.33% of records are duplicates");
        assert!(alert.source_system.is_none());
        assert!(duplicate_alert(&rows, 50.0).is_none());
        assert!(duplicate_alert(&[], 0.0).is_none());
    }

    #[test]
    fn batch_field_completeness_is_exact() {
        let rows = vec![
            json!({"employee_id": "1", "first_name": "John", "email": "john@example.com"}),
            json!({"employee_id": "2", "first_name": null, "email": "jane@example.com"}),
            json!({"employee_id": "3", "first_name": "Bob"}),
        ]
        .into_iter()
        .map(|v| match v {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        })
        .collect::<Vec<_>>();

        let q = assess_data_quality(&rows, &RuleSet::employee());
        assert_eq!(q.total_records, 3);
        assert!((q.field_completeness["employee_id"] - 100.0).abs() < 1e-9);
        assert!((q.field_completeness["first_name"] - 200.0 / 3.0).abs() < 1e-9);
        assert!((q.field_completeness["email"] - 200.0 / 3.0).abs() < 1e-9);
        assert!((q.completeness_score - (100.0 + 400.0 / 3.0) / 3.0).abs() < 1e-9);
        assert!((q.validity_score - 100.0).abs() < 1e-9);
        assert_eq!(q.duplicate_count, 0);
    }

    #[test]
    fn batch_counts_duplicates_and_invalid() {
        let rows: Vec<Row> = ["E1", "E1", ""]
            .iter()
            .map(|id| {
                let mut r = Row::new();
                r.insert(IDENTITY_KEY.into(), json!(id));
                r
            })
            .collect();
        let q = assess_data_quality(&rows, &RuleSet::employee());
        assert_eq!(q.duplicate_count, 1);
        assert!((q.validity_score - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(assess_data_quality(&[], &RuleSet::employee()), BatchQuality::default());
    }

    struct DownNotifier;

    #[async_trait]
    impl Notifier for DownNotifier {
        async fn send(&self, _alerts: &[Alert]) -> Result<(), NotifyError> {
            Err(NotifyError::Unavailable("webhook unreachable".into()))
        }
    }

    /// SQLite store that counts audited alerts and can reject them.
    struct AuditStore {
        inner: SqliteCheckpointStore,
        reject_alerts: AtomicBool,
        audited: AtomicU64,
    }

    impl AuditStore {
        fn new(reject_alerts: bool) -> Self {
            Self {
                inner: SqliteCheckpointStore::in_memory().unwrap(),
                reject_alerts: AtomicBool::new(reject_alerts),
                audited: AtomicU64::new(0),
            }
        }
    }

    impl CheckpointStore for AuditStore {
        fn get_cursor(&self, process: &ProcessName) -> Result<Option<ExtractionCursor>, StateError> {
            self.inner.get_cursor(process)
        }

        fn put_cursor(&self, process: &ProcessName, cursor: &ExtractionCursor) -> Result<(), StateError> {
            self.inner.put_cursor(process, cursor)
        }

        fn start_run(&self, process: &ProcessName) -> Result<i64, StateError> {
            self.inner.start_run(process)
        }

        fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> Result<(), StateError> {
            self.inner.complete_run(run_id, status, stats)
        }

        fn insert_quarantined(
            &self,
            process: &ProcessName,
            run_id: i64,
            records: &[QuarantinedRecord],
        ) -> Result<u64, StateError> {
            self.inner.insert_quarantined(process, run_id, records)
        }

        fn append_alerts(&self, report: &QualityReport) -> Result<u64, StateError> {
            if self.reject_alerts.load(Ordering::SeqCst) {
                return Err(StateError::LockPoisoned);
            }
            let inserted = self.inner.append_alerts(report)?;
            self.audited.fetch_add(inserted, Ordering::SeqCst);
            Ok(inserted)
        }
    }

    async fn seeded_warehouse(now: DateTime<Utc>) -> Arc<SqliteWarehouse> {
        let wh = Arc::new(SqliteWarehouse::in_memory().unwrap());
        let schema = TableSchema::employees_unified();
        wh.ensure_table("employees_unified", &schema).await.unwrap();

        let mut rows = Vec::new();
        for (i, hours_ago) in [1, 2, 3].into_iter().enumerate() {
            let mut r = UnifiedRecord::new(SourceSystem::Smarthr, format!("s{i}"), now - Duration::hours(hours_ago));
            r.employee_id = Some(format!("S{i}"));
            r.email = Some(if i == 0 { "bad".into() } else { format!("s{i}@example.com") });
            rows.push(r.to_row());
        }
        let mut stale = UnifiedRecord::new(SourceSystem::Garoon, "g0", now - Duration::days(3));
        stale.employee_id = Some("G0".into());
        stale.email = Some("g0@example.com".into());
        rows.push(stale.to_row());

        wh.bulk_insert("employees_unified", &schema, &rows).await.unwrap();
        wh
    }

    #[tokio::test]
    async fn monitor_reports_and_audits_despite_notifier_failure() {
        let now = ts("2026-03-10T12:00:00Z");
        let wh = seeded_warehouse(now).await;
        let store = Arc::new(AuditStore::new(false));
        let monitor = QualityMonitor::new(
            wh,
            store.clone(),
            Arc::new(DownNotifier),
            "employees_unified",
            QualityConfig::default(),
        );

        let report = monitor.assess_at(now).await.unwrap();
        let kinds: Vec<_> = report.alerts.iter().map(|a| (a.kind, a.source_system)).collect();
        assert_eq!(
            kinds,
            vec![
                (AlertKind::DataFreshness, Some(SourceSystem::Garoon)),
                (AlertKind::DataValidity, Some(SourceSystem::Smarthr)),
            ]
        );
        assert_eq!(report.alerts[0].message, "garoon data is 72 hours old");
        assert_eq!(report.alerts[1].message, "smarthr email validity is 66.67%");
        assert_eq!(report.alerts_count, 2);
        assert_eq!(report.count(Severity::Warning), 2);
        assert_eq!(store.audited.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn audit_failure_still_returns_report() {
        let now = ts("2026-03-10T12:00:00Z");
        let store = Arc::new(AuditStore::new(true));
        let monitor = QualityMonitor::new(
            seeded_warehouse(now).await,
            store.clone(),
            Arc::new(LogNotifier),
            "employees_unified",
            QualityConfig::default(),
        );

        let report = monitor.assess_at(now).await.unwrap();
        assert_eq!(report.alerts_count, 2);
        assert_eq!(store.audited.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_table_yields_empty_report() {
        let monitor = QualityMonitor::new(
            Arc::new(SqliteWarehouse::in_memory().unwrap()),
            Arc::new(SqliteCheckpointStore::in_memory().unwrap()),
            Arc::new(LogNotifier),
            "employees_unified",
            QualityConfig::default(),
        );
        let report = monitor.assess().await.unwrap();
        assert!(report.alerts.is_empty());
    }
}
