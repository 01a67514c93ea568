//! Confidence scoring.
//!
//! Five components are scored independently ([`ComponentScorer`]) and then
//! combined into a single weighted total ([`ConfidenceAggregator`]). The
//! resulting [`ConfidenceBreakdown`] carries every number needed to
//! recompute the total.

mod aggregator;
mod scorer;
mod weights;

pub use aggregator::{ConfidenceAggregator, HIGH_SCORE, IMPROVABLE_SCORE, LOW_SCORE};
pub use scorer::{
    CitationReport, ComplianceOutcome, ComponentScorer, Signal, Signals, VerificationOutcome,
    SHORT_RESPONSE_CONSISTENCY_FLOOR,
};
pub use weights::{ConfigError, WeightConfig, DEFAULT_WEIGHTS, WEIGHT_TOLERANCE};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::decision::DecisionThresholds;

/// The five scored components, in their fixed reporting order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKey {
    FactVerification,
    CitationValidity,
    ConsistencyCheck,
    CompliancePolicies,
    ResponseClarity,
}

impl ComponentKey {
    pub const ALL: [ComponentKey; 5] = [
        ComponentKey::FactVerification,
        ComponentKey::CitationValidity,
        ComponentKey::ConsistencyCheck,
        ComponentKey::CompliancePolicies,
        ComponentKey::ResponseClarity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKey::FactVerification => "fact_verification",
            ComponentKey::CitationValidity => "citation_validity",
            ComponentKey::ConsistencyCheck => "consistency_check",
            ComponentKey::CompliancePolicies => "compliance_policies",
            ComponentKey::ResponseClarity => "response_clarity",
        }
    }

    /// Human-readable label used in contribution factors.
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKey::FactVerification => "Fact Verification",
            ComponentKey::CitationValidity => "Citation Validity",
            ComponentKey::ConsistencyCheck => "Consistency Check",
            ComponentKey::CompliancePolicies => "Compliance & Policies",
            ComponentKey::ResponseClarity => "Response Clarity",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ComponentKey::FactVerification => "Share of resolved claims confirmed by a source",
            ComponentKey::CitationValidity => "Share of citations that are valid",
            ComponentKey::ConsistencyCheck => "Similarity to prior responses in the same context",
            ComponentKey::CompliancePolicies => "Adherence to compliance rules and policies",
            ComponentKey::ResponseClarity => "Readability and directness of the response",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score of a single component plus its share of the total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentScore {
    pub key: ComponentKey,
    pub label: String,

    /// `None` when the component could not be scored
    pub score: Option<f64>,

    /// Configured weight
    pub weight: f64,

    /// Weight after redistribution over scored components
    pub effective_weight: f64,

    /// `score * effective_weight`, 0 when unscored
    pub weighted_score: f64,

    pub description: String,

    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unscored_reason: Option<String>,
}

impl ComponentScore {
    pub fn scored(key: ComponentKey, weight: f64, score: f64) -> Self {
        Self {
            key,
            label: key.label().to_string(),
            score: Some(clamp_unit(score)),
            weight,
            effective_weight: 0.0,
            weighted_score: 0.0,
            description: key.description().to_string(),
            details: BTreeMap::new(),
            unscored_reason: None,
        }
    }

    pub fn unscored(key: ComponentKey, weight: f64, reason: impl Into<String>) -> Self {
        Self {
            key,
            label: key.label().to_string(),
            score: None,
            weight,
            effective_weight: 0.0,
            weighted_score: 0.0,
            description: key.description().to_string(),
            details: BTreeMap::new(),
            unscored_reason: Some(reason.into()),
        }
    }

    pub fn with_detail(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(name.to_string(), value.into());
        self
    }

    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    /// Read an integer detail, 0 when missing.
    pub fn count(&self, name: &str) -> u64 {
        self.details
            .get(name)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
    }
}

/// Clamp into [0, 1]; NaN becomes 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Human-readable factors that raised or lowered the total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Contributions {
    pub positive_factors: Vec<String>,
    pub negative_factors: Vec<String>,
}

/// The full, explainable confidence computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceBreakdown {
    pub total_score: f64,
    pub components: BTreeMap<ComponentKey, ComponentScore>,
    pub contributions: Contributions,
}

impl ConfidenceBreakdown {
    pub fn component(&self, key: ComponentKey) -> Option<&ComponentScore> {
        self.components.get(&key)
    }

    pub fn score_of(&self, key: ComponentKey) -> Option<f64> {
        self.component(key).and_then(|c| c.score)
    }

    pub fn scored_count(&self) -> usize {
        self.components.values().filter(|c| c.is_scored()).count()
    }

    /// Sum of weighted scores, clamped the same way as `total_score`.
    pub fn recomputed_total(&self) -> f64 {
        self.components
            .values()
            .map(|c| c.weighted_score)
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}

/// Scoring configuration: weights plus decision thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: WeightConfig,

    #[serde(default)]
    pub thresholds: DecisionThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_order() {
        let mut keys = ComponentKey::ALL.to_vec();
        keys.reverse();
        keys.sort();
        assert_eq!(keys, ComponentKey::ALL.to_vec());
        assert_eq!(ComponentKey::ResponseClarity.index(), 4);
    }

    #[test]
    fn test_component_key_serialization() {
        let json = serde_json::to_string(&ComponentKey::CompliancePolicies).unwrap();
        assert_eq!(json, "\"compliance_policies\"");
    }

    #[test]
    fn test_scored_clamps() {
        let c = ComponentScore::scored(ComponentKey::ResponseClarity, 0.2, 1.7);
        assert_eq!(c.score, Some(1.0));
        let c = ComponentScore::scored(ComponentKey::ResponseClarity, 0.2, -0.3);
        assert_eq!(c.score, Some(0.0));
    }

    #[test]
    fn test_scoring_config_defaults_from_empty_yaml() {
        let config: ScoringConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ScoringConfig::default());
    }
}
