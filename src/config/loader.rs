//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    Project = 1,
    User = 2,
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Where each tier is read from.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Explicit file that replaces tier discovery entirely.
    pub explicit_file: Option<PathBuf>,
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover paths from the environment and the usual locations.
    pub fn discover() -> Self {
        let explicit_file = std::env::var("SQUAD_TASKS_CONFIG_PATH")
            .ok()
            .map(PathBuf::from);

        let project_dir = std::env::var("SQUAD_TASKS_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("squad-tasks")));

        let user_dir = std::env::var("SQUAD_TASKS_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".squad-tasks")));

        Self {
            explicit_file,
            project_dir,
            user_dir,
        }
    }

    /// Explicit directories, no explicit file.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            explicit_file: None,
            project_dir,
            user_dir,
        }
    }

    /// Use a single file instead of tier discovery.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }
}

/// Loads and merges configuration tiers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Files that contributed, lowest tier first.
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load from discovered paths and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load with explicit paths, reading overrides from the process environment.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        Self::load_with_env(paths, |key| std::env::var(key).ok())
    }

    /// Load with explicit paths and an environment lookup.
    pub fn load_with_env<E>(paths: ConfigPaths, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut sources = Vec::new();

        let mut config = if let Some(explicit) = &paths.explicit_file {
            let config = Config::load(explicit)
                .with_context(|| format!("reading config file {}", explicit.display()))?;
            sources.push((ConfigTier::Project, explicit.clone()));
            config
        } else {
            let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];

            let candidates = [
                (ConfigTier::Project, paths.project_dir.as_deref()),
                (ConfigTier::User, paths.user_dir.as_deref()),
            ];
            for (tier, dir) in candidates {
                let Some(dir) = dir else { continue };
                let file = dir.join("config.yaml");
                if let Some(value) = read_tier(&file) {
                    tiers.push(value);
                    sources.push((tier, file));
                }
            }

            serde_json::from_value(deep_merge_all(tiers))?
        };

        if apply_env_overrides(&mut config, env) {
            sources.push((ConfigTier::Environment, PathBuf::from("<env>")));
        }
        debug!(sources = ?sources, "Configuration loaded");

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.paths.project_dir.as_deref()
    }

    pub fn user_dir(&self) -> Option<&Path> {
        self.paths.user_dir.as_deref()
    }
}

/// Read one tier's YAML. Missing files are skipped quietly; unreadable
/// or malformed files are skipped with a warning.
fn read_tier(file: &Path) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Skipping unreadable config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %file.display(), error = %e, "Skipping malformed config file");
            None
        }
    }
}

/// Apply environment overrides. Returns true if any applied.
fn apply_env_overrides<E>(config: &mut Config, env: E) -> bool
where
    E: Fn(&str) -> Option<String>,
{
    let mut applied = false;

    if let Some(db_path) = env("SQUAD_TASKS_DB_PATH") {
        config.store.db_path = PathBuf::from(db_path);
        applied = true;
    }

    if let Some(media_dir) = env("SQUAD_TASKS_MEDIA_DIR") {
        config.store.media_dir = PathBuf::from(media_dir);
        applied = true;
    }

    if let Some(interval) = env("SQUAD_TASKS_REMINDER_INTERVAL") {
        match interval.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => {
                config.reminders.scan_interval_secs = secs;
                applied = true;
            }
            _ => warn!(value = %interval, "Ignoring invalid SQUAD_TASKS_REMINDER_INTERVAL"),
        }
    }

    applied
}
