//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! - Default values
//! - `.freshwatch/settings.toml`, found by walking up from the current directory
//! - Environment variables
//!
//! # Environment Variables
//!
//! Prefixed with `FRESHWATCH_`, double underscores separate nested levels:
//! - `FRESHWATCH_WATCHER__DEBOUNCE_MS=250` sets `watcher.debounce_ms`
//! - `FRESHWATCH_CACHE__CONTENT_HASH=git` sets `cache.content_hash`
//! - `FRESHWATCH_LOGGING__DEFAULT=debug` sets `logging.default`
//!
//! `FRESHWATCH_ROOT` is not a setting; it overrides project root detection
//! (see [`crate::project`]).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cache::{ContentHashMode, FingerprintPolicy};
use crate::watcher::{DEFAULT_EXCLUDES, ESTIMATE_CAP, HARD_THRESHOLD, WARN_THRESHOLD, WatchError};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".freshwatch";
/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Quiet period before a path settles
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path segment names never watched
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Files counted before the size estimate gives up
    #[serde(default = "default_estimate_cap")]
    pub estimate_cap: usize,

    /// Estimates above this watch with a warning
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: usize,

    /// Estimates at or above this are refused
    #[serde(default = "default_hard_threshold")]
    pub hard_threshold: usize,

    /// Raw events buffered between the OS backend and the debouncer
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CacheConfig {
    #[serde(default)]
    pub content_hash: ContentHashMode,

    #[serde(default)]
    pub policy: FingerprintPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for everything not listed in `modules`
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `freshwatch::watcher = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_exclude() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}
fn default_estimate_cap() -> usize {
    ESTIMATE_CAP
}
fn default_warn_threshold() -> usize {
    WARN_THRESHOLD
}
fn default_hard_threshold() -> usize {
    HARD_THRESHOLD
}
fn default_event_buffer() -> usize {
    1024
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watcher: WatcherConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            exclude: default_exclude(),
            estimate_cap: default_estimate_cap(),
            warn_threshold: default_warn_threshold(),
            hard_threshold: default_hard_threshold(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FRESHWATCH_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.freshwatch/settings.toml` in the current directory or an ancestor.
    pub fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE));
            }
        }

        None
    }

    /// Reject threshold combinations that make the size guard meaningless.
    pub fn validate(&self) -> Result<(), WatchError> {
        let w = &self.watcher;
        let reason = if w.debounce_ms == 0 {
            Some("watcher.debounce_ms must be greater than zero".to_string())
        } else if w.warn_threshold >= w.hard_threshold {
            Some(format!(
                "watcher.warn_threshold ({}) must be below watcher.hard_threshold ({})",
                w.warn_threshold, w.hard_threshold
            ))
        } else if w.estimate_cap > w.hard_threshold {
            Some(format!(
                "watcher.estimate_cap ({}) must not exceed watcher.hard_threshold ({})",
                w.estimate_cap, w.hard_threshold
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(WatchError::ConfigError { reason }),
            None => Ok(()),
        }
    }

    /// Save current configuration to file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file under `dir`.
    pub fn init_config_file(dir: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
