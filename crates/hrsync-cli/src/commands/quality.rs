use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use hrsync_engine::{LogNotifier, QualityMonitor};
use hrsync_types::Severity;

use super::{load_config, open_store, open_warehouse, print_json};

/// Execute the `quality` command. Exits non-zero when alerts are raised.
pub async fn execute(config_path: &Path, target: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let table = config
        .targets
        .get(target)
        .map(|t| t.table.clone())
        .with_context(|| format!("Unknown target '{target}'"))?;

    let monitor = QualityMonitor::new(
        open_warehouse(&config)?,
        open_store(&config)?,
        Arc::new(LogNotifier),
        table,
        config.quality.clone(),
    );
    let report = monitor
        .assess()
        .await
        .context("Quality assessment failed")?;
    print_json(&report)?;

    if report.alerts_count > 0 {
        anyhow::bail!(
            "{} quality alert(s) raised ({} errors, {} warnings)",
            report.alerts_count,
            report.count(Severity::Error),
            report.count(Severity::Warning)
        );
    }
    Ok(())
}
