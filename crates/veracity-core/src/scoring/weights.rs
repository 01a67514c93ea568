//! Component weights.
//!
//! Weights are fixed at construction and validated once. Anything holding a
//! `WeightConfig` can assume every weight is in [0, 1] and that the five of
//! them sum to 1.0.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ComponentKey;

/// Allowed drift of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Default weights in component order: fact verification, citation
/// validity, consistency, compliance, clarity.
pub const DEFAULT_WEIGHTS: [f64; 5] = [0.25, 0.15, 0.15, 0.25, 0.20];

/// Errors raised when building a weight configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Weight for {component} must be within [0, 1], got {value}")]
    InvalidWeight { component: ComponentKey, value: f64 },

    #[error("Component weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },
}

/// Immutable per-component weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights", into = "RawWeights")]
pub struct WeightConfig {
    weights: [f64; 5],
}

/// Serialized form, validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawWeights {
    fact_verification: f64,
    citation_validity: f64,
    consistency_check: f64,
    compliance_policies: f64,
    response_clarity: f64,
}

impl WeightConfig {
    pub fn new(
        fact_verification: f64,
        citation_validity: f64,
        consistency_check: f64,
        compliance_policies: f64,
        response_clarity: f64,
    ) -> Result<Self, ConfigError> {
        let weights = [
            fact_verification,
            citation_validity,
            consistency_check,
            compliance_policies,
            response_clarity,
        ];

        for (key, value) in ComponentKey::ALL.iter().zip(weights) {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidWeight {
                    component: *key,
                    value,
                });
            }
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        Ok(Self { weights })
    }

    pub fn weight(&self, key: ComponentKey) -> f64 {
        self.weights[key.index()]
    }

    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Weights paired with their component, in component order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentKey, f64)> + '_ {
        ComponentKey::ALL.iter().copied().zip(self.weights.iter().copied())
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        debug_assert!((DEFAULT_WEIGHTS.iter().sum::<f64>() - 1.0).abs() <= WEIGHT_TOLERANCE);
        Self {
            weights: DEFAULT_WEIGHTS,
        }
    }
}

impl TryFrom<RawWeights> for WeightConfig {
    type Error = ConfigError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        WeightConfig::new(
            raw.fact_verification,
            raw.citation_validity,
            raw.consistency_check,
            raw.compliance_policies,
            raw.response_clarity,
        )
    }
}

impl From<WeightConfig> for RawWeights {
    fn from(config: WeightConfig) -> Self {
        let [fact_verification, citation_validity, consistency_check, compliance_policies, response_clarity] =
            config.weights;
        RawWeights {
            fact_verification,
            citation_validity,
            consistency_check,
            compliance_policies,
            response_clarity,
        }
    }
}
