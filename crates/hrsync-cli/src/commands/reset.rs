use std::path::Path;

use anyhow::Result;
use hrsync_engine::{Pipeline, SyncRequest};

use super::{load_config, open_store, open_warehouse, print_json};

/// Execute the `reset` command.
pub async fn execute(config_path: &Path, source: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config, open_store(&config)?, open_warehouse(&config)?);

    let response = pipeline
        .handle(&SyncRequest {
            source: source.to_string(),
            target: String::new(),
            test: false,
            reset: true,
        })
        .await;
    print_json(&response)?;

    if !response.is_success() {
        anyhow::bail!("Reset failed: {}", response.message);
    }
    Ok(())
}
