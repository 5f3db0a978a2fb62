//! Pipeline YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::PipelineConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut missing = Vec::new();

    let result = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        match std::env::var(&cap[1]) {
            Ok(val) => val,
            Err(_) => {
                missing.push(cap[1].to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        missing.dedup();
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result.into_owned())
}

/// Parse a config YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_config_str(yaml_str: &str) -> Result<PipelineConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: PipelineConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse hrsync config YAML")?;
    Ok(config)
}

/// Parse a config YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_substitution() {
        std::env::set_var("HRSYNC_TEST_FEED_DIR", "/srv/feeds");
        let input = "path: ${HRSYNC_TEST_FEED_DIR}/garoon.json";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "path: /srv/feeds/garoon.json");
        std::env::remove_var("HRSYNC_TEST_FEED_DIR");
    }

    #[test]
    fn no_env_vars_passthrough() {
        let input = "page_size: 100";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn multiple_missing_env_vars_all_reported() {
        let input = "${HRSYNC_MISSING_X} and ${HRSYNC_MISSING_Y}";
        let err_msg = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err_msg.contains("HRSYNC_MISSING_X"));
        assert!(err_msg.contains("HRSYNC_MISSING_Y"));
    }

    #[test]
    fn parse_config_from_string() {
        std::env::set_var("HRSYNC_TEST_STATE", "/var/lib/hrsync/state.db");
        let yaml = r#"
version: "1.0"
state:
  path: ${HRSYNC_TEST_STATE}
targets:
  warehouse:
    table: employees_unified
sources:
  - system: smarthr
    connector:
      kind: file
      path: smarthr.json
"#;
        let config = parse_config_str(yaml).unwrap();
        assert_eq!(config.state.path.to_str(), Some("/var/lib/hrsync/state.db"));
        std::env::remove_var("HRSYNC_TEST_STATE");
    }

    #[test]
    fn parse_invalid_yaml_errors() {
        assert!(parse_config_str("this is not: [valid: yaml: {{{}}}").is_err());
    }

    #[test]
    fn parse_config_file_not_found() {
        let err_msg = parse_config(Path::new("/nonexistent/hrsync.yaml"))
            .unwrap_err()
            .to_string();
        assert!(err_msg.contains("Failed to read config file"));
    }

    #[test]
    fn parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hrsync.yaml");
        std::fs::write(
            &path,
            "version: \"1.0\"\ntargets:\n  warehouse:\n    table: employees_unified\nsources: []\n",
        )
        .unwrap();
        let config = parse_config(&path).unwrap();
        assert!(config.sources.is_empty());
    }
}
