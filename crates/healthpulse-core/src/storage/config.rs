//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Whether medication reminders run, and the clock time of each slot
//! - The ceiling on simultaneously pending reminder timers
//! - How many days of history the engagement view asks for
//!
//! Configuration is stored at `~/.config/healthpulse/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::reminders::{parse_clock_time, SchedulerOptions, SlotTimes, DEFAULT_MAX_PENDING};

/// Clock time (`HH:MM`) of each time-of-day slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsConfig {
    #[serde(default = "default_morning")]
    pub morning: String,
    #[serde(default = "default_afternoon")]
    pub afternoon: String,
    #[serde(default = "default_evening")]
    pub evening: String,
    #[serde(default = "default_night")]
    pub night: String,
}

/// Reminder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    #[serde(default)]
    pub slots: SlotsConfig,
}

/// Engagement view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// Days of record history requested from the record source.
    #[serde(default = "default_history_window_days")]
    pub history_window_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/healthpulse/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
}

// Default functions
fn default_morning() -> String {
    "08:00".into()
}
fn default_afternoon() -> String {
    "14:00".into()
}
fn default_evening() -> String {
    "18:00".into()
}
fn default_night() -> String {
    "21:00".into()
}
fn default_true() -> bool {
    true
}
fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING
}
fn default_history_window_days() -> u32 {
    30
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            morning: default_morning(),
            afternoon: default_afternoon(),
            evening: default_evening(),
            night: default_night(),
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_pending: default_max_pending(),
            slots: SlotsConfig::default(),
        }
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            history_window_days: default_history_window_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reminders: RemindersConfig::default(),
            engagement: EngagementConfig::default(),
        }
    }
}

impl SlotsConfig {
    /// Parse the configured clock times.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first slot whose time is not `HH:MM`.
    pub fn slot_times(&self) -> Result<SlotTimes, ConfigError> {
        let parse = |key: &str, raw: &str| {
            parse_clock_time(raw).map_err(|e| ConfigError::InvalidValue {
                key: format!("reminders.slots.{key}"),
                message: e.to_string(),
            })
        };
        Ok(SlotTimes {
            morning: parse("morning", &self.morning)?,
            afternoon: parse("afternoon", &self.afternoon)?,
            evening: parse("evening", &self.evening)?,
            night: parse("night", &self.night)?,
        })
    }
}

impl RemindersConfig {
    /// Build scheduler options from this section.
    ///
    /// # Errors
    ///
    /// Returns an error if a slot time is malformed or `max_pending` is zero.
    pub fn scheduler_options(&self) -> Result<SchedulerOptions, ConfigError> {
        if self.max_pending == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reminders.max_pending".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(SchedulerOptions {
            slot_times: self.slots.slot_times()?,
            max_pending: self.max_pending,
        })
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    let n = value
                        .parse::<u64>()
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/healthpulse"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the defaults cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        // Reject values that would not survive into the scheduler
        updated.reminders.scheduler_options()?;
        *self = updated;
        Ok(())
    }
}
