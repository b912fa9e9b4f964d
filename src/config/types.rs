//! Configuration types.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub reminders: RemindersConfig,

    #[serde(default)]
    pub overdue: OverdueConfig,

    #[serde(default)]
    pub activity: ActivityConfig,
}

impl Config {
    /// Load one configuration file. Empty files yield the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Option<Config> = serde_yaml::from_str(&content)?;
        Ok(config.unwrap_or_default())
    }
}

/// Where records and uploaded files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Root directory for uploaded files, one subdirectory per bucket.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,

    /// Prefix for public file URLs. Defaults to a `file://` URL of the
    /// media directory.
    #[serde(default)]
    pub public_url_base: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            media_dir: default_media_dir(),
            public_url_base: None,
        }
    }
}

impl StoreConfig {
    pub fn public_url_base(&self) -> String {
        match &self.public_url_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("file://{}", self.media_dir.display()),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".squad-tasks/board.db")
}

fn default_media_dir() -> PathBuf {
    PathBuf::from(".squad-tasks/media")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Seconds between scans (default: 30).
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// How far back a reminder still fires, in seconds (default: 120).
    #[serde(default = "default_window")]
    pub window_secs: i64,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            window_secs: default_window(),
        }
    }
}

fn default_scan_interval() -> u64 {
    30
}

fn default_window() -> i64 {
    120
}

/// Escalation thresholds for overdue tasks, in whole days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueConfig {
    #[serde(default = "default_attention_days")]
    pub attention_days: i64,

    #[serde(default = "default_urgent_days")]
    pub urgent_days: i64,

    /// Days before an already-notified task is notified again, unless its
    /// urgency has gone up in the meantime (default: 3).
    #[serde(default = "default_renotify_after_days")]
    pub renotify_after_days: i64,
}

impl Default for OverdueConfig {
    fn default() -> Self {
        Self {
            attention_days: default_attention_days(),
            urgent_days: default_urgent_days(),
            renotify_after_days: default_renotify_after_days(),
        }
    }
}

fn default_attention_days() -> i64 {
    3
}

fn default_urgent_days() -> i64 {
    7
}

fn default_renotify_after_days() -> i64 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Entries kept in the session's activity buffer (default: 100).
    #[serde(default = "default_retained_entries")]
    pub retained_entries: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            retained_entries: default_retained_entries(),
        }
    }
}

fn default_retained_entries() -> usize {
    crate::activity::DEFAULT_RETAINED_ENTRIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.db_path, PathBuf::from(".squad-tasks/board.db"));
        assert_eq!(config.reminders.scan_interval_secs, 30);
        assert_eq!(config.reminders.window_secs, 120);
        assert_eq!(config.overdue.urgent_days, 7);
        assert_eq!(config.activity.retained_entries, 100);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config: Config = serde_yaml::from_str("overdue:\n  urgent_days: 10\n").unwrap();
        assert_eq!(config.overdue.urgent_days, 10);
        assert_eq!(config.overdue.attention_days, 3);
        assert_eq!(config.reminders.window_secs, 120);
    }

    #[test]
    fn test_public_url_base() {
        let mut store = StoreConfig::default();
        assert_eq!(store.public_url_base(), "file://.squad-tasks/media");
        store.public_url_base = Some("https://cdn.example.com/".into());
        assert_eq!(store.public_url_base(), "https://cdn.example.com");
    }
}
