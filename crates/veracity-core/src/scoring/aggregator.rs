//! Confidence aggregator: weighted total plus contribution factors.
//!
//! Unscored components get an effective weight of 0 and their configured
//! weight is spread proportionally over the scored ones, so the total stays
//! on the same [0, 1] scale whatever subset of signals was available.

use std::collections::BTreeMap;

use super::{
    clamp_unit, ComponentKey, ComponentScore, ConfidenceBreakdown, Contributions, WeightConfig,
};

/// Scores at or above this count as a positive factor.
pub const HIGH_SCORE: f64 = 0.80;

/// Scores below this count as a low negative factor.
pub const LOW_SCORE: f64 = 0.50;

/// Scores in `[LOW_SCORE, IMPROVABLE_SCORE)` could be improved.
pub const IMPROVABLE_SCORE: f64 = 0.70;

/// Combines component scores into a [`ConfidenceBreakdown`].
#[derive(Debug, Clone, Default)]
pub struct ConfidenceAggregator {
    weights: WeightConfig,
}

impl ConfidenceAggregator {
    pub fn new(weights: WeightConfig) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    /// Aggregate component scores.
    ///
    /// Components missing from `scores` are treated as unscored.
    pub fn aggregate(&self, scores: Vec<ComponentScore>) -> ConfidenceBreakdown {
        let mut components: BTreeMap<ComponentKey, ComponentScore> = scores
            .into_iter()
            .map(|mut c| {
                c.weight = self.weights.weight(c.key);
                (c.key, c)
            })
            .collect();

        for key in ComponentKey::ALL {
            components.entry(key).or_insert_with(|| {
                ComponentScore::unscored(key, self.weights.weight(key), "no signal provided")
            });
        }

        let scored_weight: f64 = components
            .values()
            .filter(|c| c.is_scored())
            .map(|c| c.weight)
            .sum();

        for component in components.values_mut() {
            match component.score {
                Some(score) if scored_weight > 0.0 => {
                    component.effective_weight = component.weight / scored_weight;
                    component.weighted_score = score * component.effective_weight;
                }
                _ => {
                    component.effective_weight = 0.0;
                    component.weighted_score = 0.0;
                }
            }
        }

        let total_score = clamp_unit(components.values().map(|c| c.weighted_score).sum());
        let contributions = contributions(&components);

        tracing::debug!(
            total_score,
            scored = components.values().filter(|c| c.is_scored()).count(),
            "Aggregated confidence"
        );

        ConfidenceBreakdown {
            total_score,
            components,
            contributions,
        }
    }
}

fn contributions(components: &BTreeMap<ComponentKey, ComponentScore>) -> Contributions {
    let mut out = Contributions::default();

    for component in components.values() {
        let label = &component.label;
        match component.score {
            None => {
                let reason = component
                    .unscored_reason
                    .as_deref()
                    .unwrap_or("no signal available");
                out.negative_factors
                    .push(format!("{} was not scored - {}", label, reason));
            }
            Some(score) => {
                let pct = (score * 100.0).round() as i64;
                if score >= HIGH_SCORE {
                    out.positive_factors
                        .push(format!("{} scored high ({}%)", label, pct));
                } else if score < LOW_SCORE {
                    out.negative_factors.push(format!(
                        "{} scored low ({}%) - {}",
                        label,
                        pct,
                        low_reason(component)
                    ));
                } else if score < IMPROVABLE_SCORE {
                    out.negative_factors
                        .push(format!("{} could be improved ({}%)", label, pct));
                }
            }
        }
    }

    out
}

fn low_reason(component: &ComponentScore) -> String {
    match component.key {
        ComponentKey::FactVerification => {
            let unverified = component.count("unverified");
            let refuted = component.count("false");
            match (unverified, refuted) {
                (u, 0) => format!("{} claims could not be verified", u),
                (0, f) => format!("{} claims contradicted by sources", f),
                (u, f) => format!(
                    "{} claims could not be verified and {} were contradicted by sources",
                    u, f
                ),
            }
        }
        ComponentKey::CitationValidity => {
            format!("{} invalid citations", component.count("invalid"))
        }
        ComponentKey::ConsistencyCheck => {
            "Low consistency - may indicate new query or different response style".to_string()
        }
        ComponentKey::CompliancePolicies => "Compliance issues detected".to_string(),
        ComponentKey::ResponseClarity => "Response may be unclear or heavily hedged".to_string(),
    }
}
