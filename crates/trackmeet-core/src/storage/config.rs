//! TOML-based application configuration.
//!
//! Stores:
//! - Session tunables (countdown length, tick interval, stamina decay,
//!   location movement filter)
//! - Per-activity tier threshold overrides
//!
//! Configuration is stored at `~/.config/trackmeet/config.toml`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::ranking::{ActivityType, PerformanceClassifier, Thresholds};
use crate::session::{EngineSettings, MAX_TICK_INTERVAL_MS};

/// Session tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_countdown_ticks")]
    pub countdown_ticks: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_stamina_decay")]
    pub stamina_decay_per_tick: f64,
    #[serde(default = "default_min_distance")]
    pub min_distance_m: f64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/trackmeet/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    /// Threshold overrides keyed by activity slug (e.g. `running`).
    #[serde(default)]
    pub thresholds: BTreeMap<String, Thresholds>,
}

fn default_countdown_ticks() -> u32 {
    3
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_stamina_decay() -> f64 {
    0.2
}
fn default_min_distance() -> f64 {
    1.0
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: default_countdown_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
            stamina_decay_per_tick: default_stamina_decay(),
            min_distance_m: default_min_distance(),
        }
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

    fn set_json_value_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<()> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown().into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")).into());
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown().into())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or fails
    /// validation, or if the default config cannot be written.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load and validate a config file at `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content).map_err(ConfigError::from)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let key = match threshold_key(key) {
            Some((_, canonical)) => canonical,
            None => key.to_string(),
        };
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, &key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not save.
    ///
    /// Setting `thresholds.<activity>.<edge>` creates the override from the
    /// built-in table first, so single edges can be changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed, or
    /// the resulting config fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut candidate = self.clone();
        let mut path = key.to_string();
        if key.starts_with("thresholds.") {
            let (activity, canonical) =
                threshold_key(key).ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
            candidate
                .thresholds
                .entry(activity.slug().to_string())
                .or_insert_with(|| Thresholds::default_for(activity));
            path = canonical;
        }

        let mut json = serde_json::to_value(&candidate)?;
        Self::set_json_value_by_path(&mut json, &path, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check value ranges and threshold tables.
    pub fn validate(&self) -> Result<()> {
        let s = &self.session;
        if !(1..=MAX_TICK_INTERVAL_MS).contains(&s.tick_interval_ms) {
            return Err(invalid(
                "session.tick_interval_ms",
                &format!("must be between 1 and {MAX_TICK_INTERVAL_MS}"),
            ));
        }
        if !s.stamina_decay_per_tick.is_finite() || s.stamina_decay_per_tick < 0.0 {
            return Err(invalid("session.stamina_decay_per_tick", "must be a non-negative number"));
        }
        if !s.min_distance_m.is_finite() || s.min_distance_m < 0.0 {
            return Err(invalid("session.min_distance_m", "must be a non-negative number"));
        }
        for (slug, thresholds) in &self.thresholds {
            let key = format!("thresholds.{slug}");
            if slug.parse::<ActivityType>().is_err() {
                return Err(ConfigError::UnknownKey(key).into());
            }
            if !thresholds.is_ordered() {
                return Err(invalid(&key, "expected beginner <= intermediate <= advanced"));
            }
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            countdown_ticks: self.session.countdown_ticks,
            tick_interval_ms: self.session.tick_interval_ms,
            stamina_decay_per_tick: self.session.stamina_decay_per_tick,
            min_distance_m: self.session.min_distance_m,
        }
    }

    /// Classifier with this config's overrides. Call `validate` first; slugs
    /// that do not parse are skipped.
    pub fn classifier(&self) -> PerformanceClassifier {
        let overrides: HashMap<ActivityType, Thresholds> = self
            .thresholds
            .iter()
            .filter_map(|(slug, t)| slug.parse().ok().map(|a| (a, *t)))
            .collect();
        PerformanceClassifier::with_overrides(overrides)
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

/// Rewrite `thresholds.<activity>[.<edge>]` to use the canonical slug, so
/// `thresholds.pushups.advanced` addresses `thresholds.push-ups.advanced`.
fn threshold_key(key: &str) -> Option<(ActivityType, String)> {
    let rest = key.strip_prefix("thresholds.")?;
    let (name, edge) = match rest.split_once('.') {
        Some((name, edge)) => (name, Some(edge)),
        None => (rest, None),
    };
    let activity: ActivityType = name.parse().ok()?;
    let canonical = match edge {
        Some(edge) => format!("thresholds.{}.{edge}", activity.slug()),
        None => format!("thresholds.{}", activity.slug()),
    };
    Some((activity, canonical))
}

fn invalid(key: &str, message: &str) -> crate::error::CoreError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
    .into()
}
