//! Configuration types for dns-tools
//!
//! All settings are immutable once the engine is built. Validation happens
//! up front and reports [`Error::Configuration`] so the process entry point
//! can exit cleanly instead of failing mid-loop.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Error;
use crate::filter::FilterSet;

/// Name of the state object holding the last observed address
pub const DEFAULT_STATE_KEY: &str = "dns-tools-gip";

/// Default poll interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Poll loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Time between ticks
    #[serde(default = "default_interval", with = "interval_serde")]
    pub interval: Duration,

    /// Notify and reconcile when no previous address was stored
    ///
    /// Off by default so a fresh deployment does not alert on first boot.
    #[serde(default)]
    pub fire_on_first_observation: bool,

    /// State key under which the last address is persisted
    #[serde(default = "default_state_key")]
    pub state_key: String,
}

impl WatchSettings {
    /// Settings with the given interval and defaults otherwise
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Set the first-observation flag
    pub fn with_fire_on_first_observation(mut self, fire: bool) -> Self {
        self.fire_on_first_observation = fire;
        self
    }

    /// Set the state key
    pub fn with_state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = key.into();
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), Error> {
        if self.interval.is_zero() {
            return Err(Error::config("Poll interval must be > 0"));
        }
        if self.state_key.is_empty() {
            return Err(Error::config("State key cannot be empty"));
        }
        Ok(())
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            fire_on_first_observation: false,
            state_key: default_state_key(),
        }
    }
}

/// DNS reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Zone apex whose records are reconciled (e.g. "example.com")
    pub domain: String,

    /// Record name filters
    #[serde(default)]
    pub filters: FilterSet,
}

impl ReconcileSettings {
    /// Create settings for a domain with no filters
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            filters: FilterSet::default(),
        }
    }

    /// Set the filters
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), Error> {
        if self.domain.trim().is_empty() {
            return Err(Error::config("DNS domain cannot be empty"));
        }
        Ok(())
    }
}

/// State store selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// Kubernetes ConfigMap in the pod's namespace
    #[default]
    Kube,

    /// JSON file
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory (lost on restart)
    Memory,
}

impl StateStoreConfig {
    /// Build from a type name and optional path
    pub fn from_parts(kind: &str, path: Option<&str>) -> Result<Self, Error> {
        match kind {
            "kube" => Ok(Self::Kube),
            "memory" => Ok(Self::Memory),
            "file" => match path {
                Some(p) if !p.is_empty() => Ok(Self::File { path: p.to_string() }),
                _ => Err(Error::config("A state file path is required for the file state store")),
            },
            other => Err(Error::config(format!(
                "State store '{other}' is not supported. Supported types: kube, file, memory"
            ))),
        }
    }
}

/// Split a comma separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a Go-style interval such as "500ms", "5s", "2m", "3h" or "1h30m"
pub fn parse_interval(raw: &str) -> Result<Duration, Error> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::config("Interval cannot be empty"));
    }

    let mut total = Duration::ZERO;
    let mut rest = raw;

    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| Error::config(format!("Interval '{raw}' is missing a unit (ms, s, m, h)")))?;
        if split == 0 {
            return Err(Error::config(format!("Interval '{raw}' must start with a number")));
        }

        let (digits, tail) = rest.split_at(split);
        let value: u64 = digits
            .parse()
            .map_err(|_| Error::config(format!("Interval value '{digits}' is too large")))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let part = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => value
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or_else(|| Error::config(format!("Interval '{raw}' overflows")))?,
            "h" => value
                .checked_mul(3600)
                .map(Duration::from_secs)
                .ok_or_else(|| Error::config(format!("Interval '{raw}' overflows")))?,
            _ => {
                return Err(Error::config(format!(
                    "Unsupported interval unit '{unit}'. Use ms, s, m or h"
                )));
            }
        };

        total = total
            .checked_add(part)
            .ok_or_else(|| Error::config(format!("Interval '{raw}' overflows")))?;
        rest = next;
    }

    if total.is_zero() {
        return Err(Error::config("Interval must be > 0"));
    }
    Ok(total)
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}

mod interval_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", value.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_interval(&raw).map_err(serde::de::Error::custom)
    }
}
