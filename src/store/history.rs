//! Executed-query history
//!
//! Persisted as JSON lines in `<config dir>/history.jsonl`, one record per
//! execution, oldest first. The file is trimmed to the configured size on
//! write. Lines that fail to parse are skipped.

use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub const HISTORY_FILE: &str = "history.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub connection_name: String,
    pub database_name: String,
    pub query: String,
    pub duration_ms: u64,
    pub rows_affected: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
    lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(dir: &Path, capacity: usize) -> Self {
        Self {
            path: dir.join(HISTORY_FILE),
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    /// Append one record, trimming the oldest entries beyond capacity
    pub fn record(&self, entry: &HistoryEntry) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        drop(file);

        let entries = self.read_all()?;
        if entries.len() > self.capacity {
            let keep = &entries[entries.len() - self.capacity..];
            let mut content = String::new();
            for entry in keep {
                content.push_str(&serde_json::to_string(entry)?);
                content.push('\n');
            }
            std::fs::write(&self.path, content)?;
        }
        Ok(())
    }

    /// Up to `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    fn read_all(&self) -> StoreResult<Vec<HistoryEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping malformed history line");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(query: &str, success: bool) -> HistoryEntry {
        HistoryEntry {
            connection_name: "local".to_string(),
            database_name: "app".to_string(),
            query: query.to_string(),
            duration_ms: 12,
            rows_affected: 3,
            success,
            error_message: (!success).then(|| "syntax error".to_string()),
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn test_recent_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path(), 100);
        store.record(&entry("SELECT 1", true)).unwrap();
        store.record(&entry("SELECT 2", false)).unwrap();
        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "SELECT 2");
        assert_eq!(recent[0].error_message.as_deref(), Some("syntax error"));
        assert_eq!(recent[1].error_message, None);
    }

    #[test]
    fn test_trims_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path(), 3);
        for i in 0..5 {
            store.record(&entry(&format!("SELECT {}", i), true)).unwrap();
        }
        let recent = store.recent(10).unwrap();
        let queries: Vec<&str> = recent.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["SELECT 4", "SELECT 3", "SELECT 2"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path(), 10);
        assert!(store.recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path(), 10);
        store.record(&entry("SELECT 1", true)).unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(HISTORY_FILE))
            .unwrap();
        writeln!(file, "{{not json").unwrap();
        assert_eq!(store.recent(5).unwrap().len(), 1);
    }
}
