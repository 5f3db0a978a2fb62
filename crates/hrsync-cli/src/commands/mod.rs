pub mod quality;
pub mod reset;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use hrsync_engine::config::parser;
use hrsync_engine::config::types::PipelineConfig;
use hrsync_engine::config::validator;
use hrsync_state::SqliteCheckpointStore;
use hrsync_warehouse::SqliteWarehouse;
use serde::Serialize;

/// Parse and validate the config before any other I/O.
pub(crate) fn load_config(path: &Path) -> Result<PipelineConfig> {
    let config = parser::parse_config(path)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    validator::validate_config(&config)?;
    tracing::debug!(
        path = %path.display(),
        sources = config.sources.len(),
        targets = config.targets.len(),
        "Config loaded"
    );
    Ok(config)
}

pub(crate) fn open_store(config: &PipelineConfig) -> Result<Arc<SqliteCheckpointStore>> {
    let store = SqliteCheckpointStore::open(&config.state.path).with_context(|| {
        format!("Failed to open state database: {}", config.state.path.display())
    })?;
    Ok(Arc::new(store))
}

pub(crate) fn open_warehouse(config: &PipelineConfig) -> Result<Arc<SqliteWarehouse>> {
    let warehouse = SqliteWarehouse::open(&config.warehouse.path).with_context(|| {
        format!("Failed to open warehouse: {}", config.warehouse.path.display())
    })?;
    Ok(Arc::new(warehouse))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
