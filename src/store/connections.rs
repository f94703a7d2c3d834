//! Recently used connections
//!
//! `<config dir>/connections.json`, one record per (host, port, database,
//! user), most recently used first. Passwords live in the secret store.

use crate::config::{ConnectionConfig, SslMode};
use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CONNECTIONS_FILE: &str = "connections.json";

/// Records kept; older entries fall off
pub const MAX_RECENT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentConnection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub ssl_mode: SslMode,
    pub last_used: DateTime<Utc>,
    pub usage_count: u32,
}

impl RecentConnection {
    fn matches(&self, config: &ConnectionConfig) -> bool {
        self.host == config.host
            && self.port == config.port
            && self.database == config.database
            && self.user == config.username
    }

    /// Connection target without password
    pub fn to_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            name: format!("{}@{}/{}", self.user, self.host, self.database),
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            username: self.user.clone(),
            password: None,
            ssl_mode: self.ssl_mode,
        }
    }
}

#[derive(Debug)]
pub struct ConnectionHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConnectionHistory {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(CONNECTIONS_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Upsert the target, bumping its usage count and moving it to the front
    pub fn record(&self, config: &ConnectionConfig) -> StoreResult<RecentConnection> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut recent = self.read()?;
        let now = Utc::now();
        let record = match recent.iter().position(|r| r.matches(config)) {
            Some(idx) => {
                let mut existing = recent.remove(idx);
                existing.last_used = now;
                existing.usage_count = existing.usage_count.saturating_add(1);
                existing.ssl_mode = config.ssl_mode;
                existing
            }
            None => RecentConnection {
                host: config.host.clone(),
                port: config.port,
                database: config.database.clone(),
                user: config.username.clone(),
                ssl_mode: config.ssl_mode,
                last_used: now,
                usage_count: 1,
            },
        };
        recent.insert(0, record.clone());
        recent.truncate(MAX_RECENT);
        self.write(&recent)?;
        Ok(record)
    }

    /// Most recently used first
    pub fn list(&self) -> StoreResult<Vec<RecentConnection>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut recent = self.read()?;
        recent.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        Ok(recent)
    }

    fn read(&self) -> StoreResult<Vec<RecentConnection>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, recent: &[RecentConnection]) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(recent)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
