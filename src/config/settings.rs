//! User settings and preferences
//!
//! Manages application settings stored in ~/.pgnav/config.toml

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Rows fetched per page when browsing a table
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_max_tabs")]
    pub max_tabs: usize,

    /// Maximum rows returned by a table search
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Entries kept in the query history file
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Hosts scanned by local discovery
    #[serde(default = "default_discovery_hosts")]
    pub discovery_hosts: Vec<String>,

    /// Ports tried on each discovery host
    #[serde(default = "default_discovery_ports")]
    pub discovery_ports: Vec<u16>,
}

fn default_page_size() -> usize {
    100
}

fn default_max_tabs() -> usize {
    5
}

fn default_search_limit() -> usize {
    500
}

fn default_history_size() -> usize {
    1000
}

fn default_discovery_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_discovery_hosts() -> Vec<String> {
    vec!["127.0.0.1".to_string()]
}

fn default_discovery_ports() -> Vec<u16> {
    vec![5432, 5433, 5434, 5435]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_tabs: default_max_tabs(),
            search_limit: default_search_limit(),
            history_size: default_history_size(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            discovery_hosts: default_discovery_hosts(),
            discovery_ports: default_discovery_ports(),
        }
    }
}

impl Settings {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Load settings from `config.toml` inside `config_dir`.
///
/// A missing file yields the defaults.
pub fn load_settings(config_dir: &Path) -> ConfigResult<Settings> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    let mut settings: Settings = toml::from_str(&content)?;
    // Zero would disable paging and tabs entirely
    settings.page_size = settings.page_size.max(1);
    settings.max_tabs = settings.max_tabs.max(1);
    Ok(settings)
}
