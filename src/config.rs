//! Configuration for the store, the simulator and the runtime.
//!
//! Each config has sensible defaults and a `validate` step that must pass
//! before the component is constructed.

use std::env;
use std::path::PathBuf;

use chrono::Duration;

use crate::error::ValidationError;

/// Environment variable overriding the durable store path.
pub const STORE_PATH_ENV: &str = "ZEROPOINT_STORE_PATH";

/// Environment variable overriding the staleness window, in days.
pub const STALE_DAYS_ENV: &str = "ZEROPOINT_STALE_DAYS";

/// Default location of the durable store document.
pub const DEFAULT_STORE_PATH: &str = "memory/zero_point_store.json";

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Entries not updated for longer than this are flagged stale on read.
    pub stale_after: Duration,
    /// Namespace prefix for entry ids.
    pub id_prefix: String,
    /// Hex characters of the content hash kept in the id.
    pub id_hash_len: usize,
    /// Whether to fsync the document after every write.
    pub sync_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::days(7),
            id_prefix: "ZP-".to_string(),
            id_hash_len: 12,
            sync_on_write: true,
        }
    }
}

impl StoreConfig {
    const MIN_HASH_LEN: usize = 8;
    const MAX_HASH_LEN: usize = 64;

    /// Defaults, overlaid with `ZEROPOINT_STALE_DAYS` when set.
    pub fn from_env() -> Result<Self, ValidationError> {
        let mut cfg = Self::default();
        if let Ok(raw) = env::var(STALE_DAYS_ENV) {
            cfg.stale_after = parse_stale_days(&raw)?;
        }
        cfg.validate()
    }

    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.stale_after <= Duration::zero() {
            return Err(ValidationError::InvalidConfig {
                reason: "stale_after must be positive".to_string(),
            });
        }
        if self.id_prefix.trim().is_empty() {
            return Err(ValidationError::InvalidConfig {
                reason: "id_prefix must not be empty".to_string(),
            });
        }
        if !(Self::MIN_HASH_LEN..=Self::MAX_HASH_LEN).contains(&self.id_hash_len) {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "id_hash_len must be within {}..={} (got {})",
                    Self::MIN_HASH_LEN,
                    Self::MAX_HASH_LEN,
                    self.id_hash_len
                ),
            });
        }
        Ok(self)
    }
}

fn parse_stale_days(raw: &str) -> Result<Duration, ValidationError> {
    let days: i64 = raw.trim().parse().map_err(|_| ValidationError::InvalidConfig {
        reason: format!("{STALE_DAYS_ENV} must be an integer number of days (got '{raw}')"),
    })?;
    Duration::try_days(days).ok_or_else(|| ValidationError::InvalidConfig {
        reason: format!("{STALE_DAYS_ENV} is out of range (got '{raw}')"),
    })
}

/// Store path from `ZEROPOINT_STORE_PATH`, falling back to
/// [`DEFAULT_STORE_PATH`].
#[must_use]
pub fn default_store_path() -> PathBuf {
    env::var_os(STORE_PATH_ENV).map_or_else(|| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from)
}

/// Digital twin configuration.
#[derive(Debug, Clone)]
pub struct TwinConfig {
    /// A stressed failure probability at or above this fails the scenario.
    pub survival_threshold: f64,
    /// Case-insensitive substrings that mark an action as irreversible.
    pub irreversible_markers: Vec<String>,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            survival_threshold: 0.7,
            irreversible_markers: ["send", "post", "trade", "delete", "publish", "transfer"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl TwinConfig {
    pub fn validate(self) -> Result<Self, ValidationError> {
        if !(self.survival_threshold > 0.0 && self.survival_threshold <= 1.0) {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "survival_threshold must be in (0, 1] (got {})",
                    self.survival_threshold
                ),
            });
        }
        if self.irreversible_markers.is_empty() {
            return Err(ValidationError::InvalidMarkers {
                reason: "at least one marker is required".to_string(),
            });
        }
        if self.irreversible_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(ValidationError::InvalidMarkers {
                reason: "markers must not be blank".to_string(),
            });
        }
        Ok(self)
    }
}

/// Governance runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum queued requests before `submit` reports `QueueFull`.
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "queue_capacity must be > 0".to_string(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        StoreConfig::default().validate().unwrap();
        TwinConfig::default().validate().unwrap();
        RuntimeConfig::default().validate().unwrap();
    }

    #[test]
    fn test_store_config_rejects_bad_values() {
        let mut c = StoreConfig::default();
        c.stale_after = Duration::zero();
        assert!(c.validate().is_err());

        let mut c = StoreConfig::default();
        c.id_prefix = "  ".to_string();
        assert!(c.validate().is_err());

        let mut c = StoreConfig::default();
        c.id_hash_len = 4;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_stale_days_parsing() {
        assert_eq!(parse_stale_days(" 30 ").unwrap(), Duration::days(30));
        assert!(parse_stale_days("a week").is_err());
        assert!(parse_stale_days(&i64::MAX.to_string()).is_err());
        assert!(parse_stale_days("-9223372036854775808").is_err());
    }

    #[test]
    fn test_twin_config_rejects_bad_values() {
        let mut c = TwinConfig::default();
        c.survival_threshold = 0.0;
        assert!(c.validate().is_err());

        let mut c = TwinConfig::default();
        c.irreversible_markers.clear();
        assert!(c.validate().is_err());

        let mut c = TwinConfig::default();
        c.irreversible_markers.push(" ".to_string());
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_runtime_config_rejects_zero_capacity() {
        let c = RuntimeConfig { queue_capacity: 0 };
        assert!(c.validate().is_err());
    }
}
