use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub automap: AutomapConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Storage and logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AutomapConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Closure engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Hard cap on edges accepted per run. Exceeding it discards the run's
    /// derived edges; the triggering edge stays committed.
    #[serde(default = "default_count_limit")]
    pub count_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            count_limit: default_count_limit(),
        }
    }
}

fn default_count_limit() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in AUTOMAP_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("AUTOMAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[automap]\ndb_path = \"automap.db\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.automap.db_path, PathBuf::from("automap.db"));
        assert_eq!(config.automap.log_level, "info");
        assert_eq!(config.engine.count_limit, 10_000);
    }

    #[test]
    fn test_load_engine_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[automap]\ndb_path = \"automap.db\"\nlog_level = \"debug\"\n\n[engine]\ncount_limit = 500\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.automap.log_level, "debug");
        assert_eq!(config.engine.count_limit, 500);
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.toml");
        assert!(Config::load_from(&path).is_err());
    }
}
