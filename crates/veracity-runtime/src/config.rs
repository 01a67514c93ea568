//! Configuration for veracity-runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use veracity_core::ScoringConfig;

/// Errors loading a runtime configuration.
#[derive(Error, Debug)]
pub enum RuntimeConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Timeout configuration
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Concurrency limits
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Verification cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Component weights and decision thresholds
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Determinism configuration
    #[serde(default)]
    pub determinism: DeterminismConfig,
}

impl RuntimeConfig {
    /// Parse a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), RuntimeConfigError> {
        if self.concurrency.max_concurrent_verifications == 0 {
            return Err(RuntimeConfigError::Invalid(
                "concurrency.max_concurrent_verifications must be at least 1".to_string(),
            ));
        }
        if self.timeouts.claim_verification.is_zero() || self.timeouts.collaborator.is_zero() {
            return Err(RuntimeConfigError::Invalid(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Per-claim verification timeout
    #[serde(with = "humantime_serde", default = "default_claim_timeout")]
    pub claim_verification: Duration,

    /// Timeout for citation, compliance, clarity and history lookups
    #[serde(with = "humantime_serde", default = "default_collaborator_timeout")]
    pub collaborator: Duration,
}

fn default_claim_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_collaborator_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            claim_verification: Duration::from_secs(5),
            collaborator: Duration::from_secs(10),
        }
    }
}

/// Concurrency configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Claims verified at the same time within one evaluation
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_verifications: usize,
}

fn default_max_concurrent() -> usize {
    8
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_verifications: 8,
        }
    }
}

/// Verification cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache TTL
    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub ttl: Duration,

    /// Maximum cache entries
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_max_entries() -> u64 {
    10000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            max_entries: 10000,
        }
    }
}

/// Determinism configuration for reproducible evaluations.
///
/// When `evaluated_at` is set, every result carries that timestamp instead
/// of the current system time, matching the CLI's `--evaluated-at` flag.
///
/// ```yaml
/// determinism:
///   evaluated_at: "2025-12-20T10:00:00Z"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeterminismConfig {
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
}

// Custom serialization for Duration using humantime format
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
