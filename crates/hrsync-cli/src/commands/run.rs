use std::path::Path;

use anyhow::Result;
use hrsync_engine::{Pipeline, SyncRequest};

use super::{load_config, open_store, open_warehouse, print_json};

/// Execute the `run` command: one sync run (or connection test) for a source.
pub async fn execute(config_path: &Path, source: &str, target: &str, test: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config, open_store(&config)?, open_warehouse(&config)?);

    let request = SyncRequest {
        source: source.to_string(),
        target: target.to_string(),
        test,
        reset: false,
    };
    let response = pipeline.handle(&request).await;
    print_json(&response)?;

    if !response.is_success() {
        anyhow::bail!("Sync failed: {}", response.message);
    }
    Ok(())
}
