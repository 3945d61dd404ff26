//! TOML-based application configuration.
//!
//! Stored as `config.toml` in the data directory. Every field has a
//! default, so a missing or partial file always loads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

use super::data_dir;

const CONFIG_FILE: &str = "config.toml";

/// Notification behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Master switch; when off, wake-ups are discarded instead of armed.
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
}

/// Timer creation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimersConfig {
    /// Duration used when `timer create` is given no duration.
    #[serde(default = "default_duration_min")]
    pub default_duration_min: u64,
}

/// Watch-loop behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Countdown refresh cadence in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub timers: TimersConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

fn default_notifications_enabled() -> bool {
    true
}

fn default_duration_min() -> u64 {
    5
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
        }
    }
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            default_duration_min: default_duration_min(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

impl Config {
    /// Path of the configuration file inside the data directory.
    pub fn path() -> Result<PathBuf, std::io::Error> {
        Ok(data_dir()?.join(CONFIG_FILE))
    }

    /// Loads the configuration, writing out defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from(CONFIG_FILE),
            message: e.to_string(),
        })?;
        if !path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Writes the configuration to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from(CONFIG_FILE),
            message: e.to_string(),
        })?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Loads the configuration, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Looks up a value by dot-separated key, e.g. `watch.tick_ms`.
    pub fn get(&self, key: &str) -> Option<String> {
        let tree = serde_json::to_value(self).ok()?;
        let mut node = &tree;
        for part in key.split('.') {
            node = node.get(part)?;
        }
        Some(match node {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Replaces a value by dot-separated key, keeping its current type.
    ///
    /// Does not persist; call [`save`](Self::save) afterwards.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            message,
        };

        let mut tree = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let slot = key
            .split('.')
            .try_fold(&mut tree, |node, part| node.get_mut(part))
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        *slot = parse_like(slot, raw).map_err(invalid)?;

        *self = serde_json::from_value(tree).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

/// Parses `raw` into the same JSON type `current` holds.
fn parse_like(current: &serde_json::Value, raw: &str) -> Result<serde_json::Value, String> {
    use serde_json::Value;
    match current {
        Value::Bool(_) => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|e| e.to_string()),
        Value::Number(_) => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|e| e.to_string()),
        Value::String(_) => Ok(Value::String(raw.to_string())),
        _ => Err("key does not name a settable value".to_string()),
    }
}
