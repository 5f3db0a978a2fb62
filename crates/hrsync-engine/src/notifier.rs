//! Alert delivery.

use async_trait::async_trait;
use hrsync_types::{Alert, Severity};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Delivers quality alerts somewhere a person will see them.
///
/// Delivery is best-effort: callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a batch of alerts. Called only with a non-empty slice.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the channel refuses or is unreachable.
    async fn send(&self, alerts: &[Alert]) -> Result<(), NotifyError>;
}

/// Writes alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, alerts: &[Alert]) -> Result<(), NotifyError> {
        let errors = alerts.iter().filter(|a| a.severity == Severity::Error).count();
        let warnings = alerts.len() - errors;
        tracing::warn!(
            alerts = alerts.len(),
            errors,
            warnings,
            "Data quality alerts raised"
        );
        for alert in alerts {
            let source = alert.source_system.map(|s| s.as_str());
            match alert.severity {
                Severity::Error => tracing::error!(
                    kind = alert.kind.as_str(),
                    source,
                    metric = alert.metric_value,
                    "{}",
                    alert.message
                ),
                Severity::Warning => tracing::warn!(
                    kind = alert.kind.as_str(),
                    source,
                    metric = alert.metric_value,
                    "{}",
                    alert.message
                ),
            }
        }
        Ok(())
    }
}
