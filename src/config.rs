//! Configuration module for inkpot

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::DEFAULT_API_URL;
use crate::models::AccountId;
use crate::paths;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Telegraph API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Number of pages to fetch per listing (max 200)
    #[serde(default = "default_page_list_limit")]
    pub page_list_limit: u32,

    /// Open one-time authorization links in the browser
    #[serde(default = "default_open_auth_url")]
    pub open_auth_url: bool,

    /// Account selected as current on startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_account: Option<AccountId>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_page_list_limit() -> u32 {
    50
}

fn default_open_auth_url() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            page_list_limit: default_page_list_limit(),
            open_auth_url: default_open_auth_url(),
            current_account: None,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path or create default
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Request timeout as a [`Duration`]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, "https://api.telegra.ph");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_list_limit = 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.page_list_limit, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.open_auth_url);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            current_account: Some(AccountId::new()),
            open_auth_url: false,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
