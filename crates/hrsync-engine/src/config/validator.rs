//! Semantic validation for parsed config values.

use std::collections::HashSet;

use anyhow::{bail, Result};
use hrsync_warehouse::ddl::validate_identifier;

use crate::config::types::{PipelineConfig, QualityConfig};

const MAX_BATCH_SIZE: usize = 10_000;

fn validate_percentage(value: f64, name: &str, errors: &mut Vec<String>) {
    if !(0.0..=100.0).contains(&value) {
        errors.push(format!("quality.{name} must be between 0 and 100, got {value}"));
    }
}

fn validate_quality(quality: &QualityConfig, errors: &mut Vec<String>) {
    if quality.window_hours == 0 {
        errors.push("quality.window_hours must be > 0".to_string());
    }
    if quality.freshness_lookback_days == 0 {
        errors.push("quality.freshness_lookback_days must be > 0".to_string());
    }
    validate_percentage(quality.completeness_pct, "completeness_pct", errors);
    validate_percentage(quality.validity_pct, "validity_pct", errors);
    validate_percentage(quality.duplicate_pct, "duplicate_pct", errors);
}

/// Validate a parsed configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the config.
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported config version '{}', expected '1.0'",
            config.version
        ));
    }

    let extraction = &config.extraction;
    if extraction.page_size == 0 {
        errors.push("extraction.page_size must be > 0".to_string());
    } else if extraction.max_records_per_run < extraction.page_size {
        errors.push(format!(
            "extraction.max_records_per_run ({}) must be >= page_size ({})",
            extraction.max_records_per_run, extraction.page_size
        ));
    }
    if extraction.fetch_timeout_seconds == 0 {
        errors.push("extraction.fetch_timeout_seconds must be > 0".to_string());
    }

    if !(1..=MAX_BATCH_SIZE).contains(&config.load.batch_size) {
        errors.push(format!(
            "load.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
            config.load.batch_size
        ));
    }

    validate_quality(&config.quality, &mut errors);

    if config.targets.is_empty() {
        errors.push("At least one target must be defined".to_string());
    }
    for (name, target) in &config.targets {
        if let Err(e) = validate_identifier(&target.table) {
            errors.push(format!("Target '{name}' has invalid table name: {e}"));
        }
    }

    if config.sources.is_empty() {
        errors.push("At least one source must be defined".to_string());
    }
    let mut seen = HashSet::new();
    for source in &config.sources {
        if !seen.insert(source.system) {
            errors.push(format!("Source '{}' is defined more than once", source.system));
        }
    }

    if !errors.is_empty() {
        bail!("Config validation failed:\n  - {}", errors.join("\n  - "));
    }

    Ok(())
}
