//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Practice length and Inhale/Hold/Exhale timings
//! - Cue settings (hold-ending threshold, cycle sound)
//! - Display cadence
//!
//! Configuration is stored at `~/.config/breathit/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::clock::{AdvancePolicy, SessionConfig};
use crate::error::{ConfigError, ValidationError};
use crate::source::{MAX_FPS, MIN_FPS};

pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 120;
pub const MIN_PHASE_SECS: u32 = 1;
pub const MAX_PHASE_SECS: u32 = 60;

/// Practice timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default = "default_minutes")]
    pub minutes: u32,
    #[serde(default = "default_phase_secs")]
    pub inhale_secs: u32,
    #[serde(default = "default_phase_secs")]
    pub hold_secs: u32,
    #[serde(default = "default_phase_secs")]
    pub exhale_secs: u32,
    #[serde(default)]
    pub advance: AdvancePolicy,
}

/// Audio cue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cue fires when a hold phase has less than this many ms left.
    #[serde(default = "default_hold_threshold_ms")]
    pub hold_threshold_ms: u64,
    /// File name of the cycle sound inside `sounds_dir`.
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub sounds_dir: Option<String>,
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/breathit/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub practice: PracticeConfig,
    #[serde(default)]
    pub cues: CuesConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

// Default functions
fn default_minutes() -> u32 {
    5
}
fn default_phase_secs() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_hold_threshold_ms() -> u64 {
    300
}
fn default_fps() -> u32 {
    crate::source::DEFAULT_FPS
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            minutes: default_minutes(),
            inhale_secs: default_phase_secs(),
            hold_secs: default_phase_secs(),
            exhale_secs: default_phase_secs(),
            advance: AdvancePolicy::default(),
        }
    }
}

impl Default for CuesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hold_threshold_ms: default_hold_threshold_ms(),
            sound: None,
            sounds_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
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
                        .map_err(|_| invalid(format!("cannot parse '{value}' as a whole number")))?;
                    serde_json::Value::Number(n.into())
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ if value.is_empty() => serde_json::Value::Null,
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing and returning defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Parse a config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        toml::from_str(&content).map_err(|e| load_failed(e.to_string()))
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
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

    /// Set a config value by dot-separated key (in memory; call `save` to persist).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.check_ranges(key)?;
        *self = updated;
        Ok(())
    }

    /// Reject practice and display values outside the ranges the UI offers.
    fn check_ranges(&self, key: &str) -> Result<(), ConfigError> {
        let p = &self.practice;
        let checks = [
            ("practice.minutes", p.minutes, MIN_MINUTES, MAX_MINUTES),
            ("practice.inhale_secs", p.inhale_secs, MIN_PHASE_SECS, MAX_PHASE_SECS),
            ("practice.hold_secs", p.hold_secs, MIN_PHASE_SECS, MAX_PHASE_SECS),
            ("practice.exhale_secs", p.exhale_secs, MIN_PHASE_SECS, MAX_PHASE_SECS),
            ("display.fps", self.display.fps, MIN_FPS, MAX_FPS),
        ];
        for (field, value, min, max) in checks {
            if field == key && !(min..=max).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{value} is outside {min}..={max}"),
                });
            }
        }
        Ok(())
    }

    /// Session parameters from the practice section, clamped into range.
    pub fn session_config(&self) -> Result<SessionConfig, ValidationError> {
        let p = &self.practice;
        let secs_ms = |secs: u32| u64::from(secs.clamp(MIN_PHASE_SECS, MAX_PHASE_SECS)) * 1000;
        let minutes = u64::from(p.minutes.clamp(MIN_MINUTES, MAX_MINUTES));
        let config = SessionConfig::new(
            secs_ms(p.inhale_secs),
            secs_ms(p.hold_secs),
            secs_ms(p.exhale_secs),
            minutes * 60 * 1000,
        )?;
        Ok(config.with_advance(p.advance))
    }
}
