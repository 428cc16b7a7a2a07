//! Configuration management for pathlimit.

use serde::{Deserialize, Serialize};

use crate::error::{PathlimitError, Result};

/// Prefix for environment variable overrides, e.g. `PATHLIMIT_LOG__LEVEL`.
pub const ENV_PREFIX: &str = "PATHLIMIT";

/// Main configuration for pathlimit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathlimitConfig {
    /// Path to the rate limit rules file
    #[serde(default)]
    pub rules_path: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PathlimitConfig {
    /// Load configuration from an optional YAML file, then apply
    /// `PATHLIMIT_*` environment overrides (`__` separates nested keys).
    pub fn load(file: Option<&str>) -> Result<Self> {
        Self::load_with_prefix(file, ENV_PREFIX)
    }

    fn load_with_prefix(file: Option<&str>, prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::new(path, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: PathlimitConfig = serde_yaml::from_str(&contents)
            .map_err(|e| PathlimitError::Config(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PathlimitConfig::default();
        assert_eq!(config.rules_path, None);
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pathlimit.yaml");
        std::fs::write(&path, "rules_path: /etc/pathlimit/rules.yaml\n").unwrap();

        let config = PathlimitConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.rules_path.as_deref(), Some("/etc/pathlimit/rules.yaml"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pathlimit.yaml");
        std::fs::write(&path, "log: [not, a, mapping]\n").unwrap();

        let err = PathlimitConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, PathlimitError::Config(_)));
    }

    #[test]
    fn test_load_file_and_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pathlimit.yaml");
        std::fs::write(&path, "rules_path: rules.yaml\nlog:\n  level: warn\n").unwrap();

        std::env::set_var("PATHLIMIT_LOADTEST_LOG__LEVEL", "debug");
        std::env::set_var("PATHLIMIT_LOADTEST_LOG__JSON", "true");
        let config =
            PathlimitConfig::load_with_prefix(path.to_str(), "PATHLIMIT_LOADTEST").unwrap();
        std::env::remove_var("PATHLIMIT_LOADTEST_LOG__LEVEL");
        std::env::remove_var("PATHLIMIT_LOADTEST_LOG__JSON");

        assert_eq!(config.rules_path.as_deref(), Some("rules.yaml"));
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
    }

    #[test]
    fn test_load_without_file() {
        let config = PathlimitConfig::load_with_prefix(None, "PATHLIMIT_UNUSEDTEST").unwrap();
        assert_eq!(config.rules_path, None);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_missing_file() {
        let err = PathlimitConfig::load_with_prefix(
            Some("/nonexistent/pathlimit.yaml"),
            "PATHLIMIT_UNUSEDTEST",
        )
        .unwrap_err();
        assert!(matches!(err, PathlimitError::Config(_)));
    }
}
