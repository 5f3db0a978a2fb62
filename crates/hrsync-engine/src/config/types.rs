use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use hrsync_types::SourceSystem;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub version: String,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    pub targets: BTreeMap<String, TargetConfig>,
    pub sources: Vec<SourceConfig>,
}

impl PipelineConfig {
    #[must_use]
    pub fn source(&self, system: SourceSystem) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.system == system)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./state/hrsync.db")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default = "default_warehouse_path")]
    pub path: PathBuf,
}

fn default_warehouse_path() -> PathBuf {
    PathBuf::from("./warehouse/hr.db")
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: default_warehouse_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_records_per_run")]
    pub max_records_per_run: u32,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
}

fn default_page_size() -> u32 {
    100
}
fn default_max_records_per_run() -> u32 {
    1000
}
fn default_fetch_timeout_seconds() -> u64 {
    30
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_records_per_run: default_max_records_per_run(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
        }
    }
}

impl ExtractionConfig {
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    500
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// What happens to records that fail validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRecordPolicy {
    /// Log and load anyway.
    #[default]
    Warn,
    /// Divert to the quarantine table instead of loading.
    Quarantine,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub on_invalid: InvalidRecordPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
    #[serde(default = "default_freshness_lookback_days")]
    pub freshness_lookback_days: u32,
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: u32,
    #[serde(default = "default_completeness_pct")]
    pub completeness_pct: f64,
    #[serde(default = "default_validity_pct")]
    pub validity_pct: f64,
    #[serde(default = "default_duplicate_pct")]
    pub duplicate_pct: f64,
}

fn default_window_hours() -> u32 {
    24
}
fn default_freshness_lookback_days() -> u32 {
    30
}
fn default_freshness_hours() -> u32 {
    24
}
fn default_completeness_pct() -> f64 {
    80.0
}
fn default_validity_pct() -> f64 {
    95.0
}
fn default_duplicate_pct() -> f64 {
    5.0
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            freshness_lookback_days: default_freshness_lookback_days(),
            freshness_hours: default_freshness_hours(),
            completeness_pct: default_completeness_pct(),
            validity_pct: default_validity_pct(),
            duplicate_pct: default_duplicate_pct(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(deserialize_with = "deserialize_source_system")]
    pub system: SourceSystem,
    pub connector: ConnectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectorConfig {
    /// JSON array export paged by offset.
    File { path: PathBuf },
}

/// Accepts canonical names and aliases (`pcacloud`, `googlesheets`, ...).
fn deserialize_source_system<'de, D>(deserializer: D) -> Result<SourceSystem, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_config() {
        let yaml = r#"
version: "1.0"
targets:
  warehouse:
    table: employees_unified
sources:
  - system: garoon
    connector:
      kind: file
      path: ./feeds/garoon.json
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.targets["warehouse"].table, "employees_unified");
        assert_eq!(config.sources[0].system, SourceSystem::Garoon);
        // Defaults applied
        assert_eq!(config.extraction.page_size, 100);
        assert_eq!(config.extraction.max_records_per_run, 1000);
        assert_eq!(config.extraction.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.load.batch_size, 500);
        assert_eq!(config.validation.on_invalid, InvalidRecordPolicy::Warn);
        assert_eq!(config.quality.freshness_hours, 24);
        assert!((config.quality.completeness_pct - 80.0).abs() < f64::EPSILON);
        assert_eq!(config.state.path, PathBuf::from("./state/hrsync.db"));
    }

    #[test]
    fn deserialize_full_config() {
        let yaml = r#"
version: "1.0"
state:
  path: /tmp/state.db
warehouse:
  path: /tmp/wh.db
extraction:
  page_size: 50
  max_records_per_run: 200
  fetch_timeout_seconds: 5
load:
  batch_size: 25
validation:
  on_invalid: quarantine
quality:
  window_hours: 12
  freshness_lookback_days: 7
  freshness_hours: 6
  completeness_pct: 90
  validity_pct: 99.5
  duplicate_pct: 1
targets:
  warehouse:
    table: employees_unified
sources:
  - system: pcacloud
    connector:
      kind: file
      path: /feeds/pca.json
  - system: googlesheets
    connector:
      kind: file
      path: /feeds/sheets.json
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.extraction.page_size, 50);
        assert_eq!(config.load.batch_size, 25);
        assert_eq!(config.validation.on_invalid, InvalidRecordPolicy::Quarantine);
        assert_eq!(config.quality.window_hours, 12);
        assert_eq!(config.sources[0].system, SourceSystem::Pca);
        assert_eq!(config.sources[1].system, SourceSystem::Sheets);
        assert!(config.source(SourceSystem::Sheets).is_some());
        assert!(config.source(SourceSystem::Jobcan).is_none());
        let ConnectorConfig::File { path } = &config.sources[0].connector;
        assert_eq!(path, &PathBuf::from("/feeds/pca.json"));
    }

    #[test]
    fn unknown_source_system_is_rejected() {
        let yaml = r#"
version: "1.0"
targets: {}
sources:
  - system: workday
    connector: {kind: file, path: x.json}
"#;
        let err = serde_yaml::from_str::<PipelineConfig>(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown source system"), "got: {err}");
    }
}
