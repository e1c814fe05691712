//! Server configuration.

use anyhow::Result;
use serde::Deserialize;
use sqlshelf_core::{HubConfig, QueryLimits};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,
    /// Rendered result size before truncation, sized to fit one chat message.
    #[serde(default = "default_max_result_bytes")]
    pub max_result_bytes: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sqlshelf")
        .join("user_databases")
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_max_result_rows() -> usize {
    200
}

fn default_max_result_bytes() -> usize {
    3_500
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage_root: default_storage_root(),
            query_timeout_ms: default_query_timeout_ms(),
            max_result_rows: default_max_result_rows(),
            max_result_bytes: default_max_result_bytes(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default location (config/default.toml) or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        Ok(Config::default())
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            storage_root: self.storage_root.clone(),
            max_upload_bytes: self.max_upload_bytes,
            query_limits: QueryLimits {
                timeout: Duration::from_millis(self.query_timeout_ms),
                max_rows: self.max_result_rows,
                max_output_bytes: self.max_result_bytes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("port = 9000\nquery_timeout_ms = 250").unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.query_timeout_ms, 250);
        assert_eq!(config.max_result_rows, 200);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.storage_root.ends_with("sqlshelf/user_databases"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sqlshelf.toml");
        std::fs::write(&path, "storage_root = \"/srv/shelf\"\nmax_result_bytes = 100\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        let hub = config.hub_config();

        assert_eq!(hub.storage_root, PathBuf::from("/srv/shelf"));
        assert_eq!(hub.query_limits.max_output_bytes, 100);
        assert_eq!(hub.query_limits.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        assert!(Config::load_from(std::path::Path::new("/nonexistent/sqlshelf.toml")).is_err());
    }
}
