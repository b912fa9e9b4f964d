//! Tiered configuration.
//!
//! Sources, lowest to highest priority, merged field-by-field:
//! 1. **Defaults** - `Config::default()`
//! 2. **Project** - `$CWD/squad-tasks/config.yaml`
//! 3. **User** - `~/.squad-tasks/config.yaml`
//! 4. **Environment** - individual overrides
//!
//! ## Environment Variables
//! - `SQUAD_TASKS_CONFIG_PATH` - Explicit config file (skips tier discovery)
//! - `SQUAD_TASKS_DB_PATH` - Database path
//! - `SQUAD_TASKS_MEDIA_DIR` - Media directory
//! - `SQUAD_TASKS_REMINDER_INTERVAL` - Reminder scan interval in seconds
//! - `SQUAD_TASKS_USER_DIR` - User config dir (default: `~/.squad-tasks`)
//! - `SQUAD_TASKS_PROJECT_DIR` - Project config dir (default: `./squad-tasks`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
