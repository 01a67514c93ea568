//! Component scorer: turns raw signals into five component scores.

use serde::{Deserialize, Serialize};

use super::{clamp_unit, ComponentKey, ComponentScore, ScoringConfig, WeightConfig};
use crate::types::{VerificationResult, VerificationStatus, Violation};

/// Consistency never scores below this for responses shorter than the
/// short-response token limit.
pub const SHORT_RESPONSE_CONSISTENCY_FLOOR: f64 = 0.5;

/// Floor of the compliance score when violations are present.
const COMPLIANCE_FLOOR: f64 = 0.1;

/// A collaborator signal that may be missing.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
    Ready(T),
    /// The collaborator failed or timed out
    Unavailable(String),
}

impl<T> Signal<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Signal::Unavailable(reason.into())
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Signal::Ready(value) => Some(value),
            Signal::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Signal::Ready(_))
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Signal<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Signal::Ready(value),
            Err(e) => Signal::Unavailable(e.to_string()),
        }
    }
}

/// Results of verifying the claims of a response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub results: Vec<VerificationResult>,

    /// Claims whose verification failed or timed out
    #[serde(default)]
    pub unresolved: usize,
}

impl VerificationOutcome {
    pub fn complete(results: Vec<VerificationResult>) -> Self {
        Self {
            results,
            unresolved: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.unresolved
    }

    pub fn count(&self, status: VerificationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn is_partial(&self) -> bool {
        self.unresolved > 0 && !self.results.is_empty()
    }
}

/// Citations found in a response and how many of them hold up.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CitationReport {
    pub total: usize,
    pub valid: usize,

    #[serde(default)]
    pub invalid_urls: Vec<String>,

    #[serde(default)]
    pub attributions: Vec<String>,
}

impl CitationReport {
    pub fn invalid(&self) -> usize {
        self.total.saturating_sub(self.valid)
    }
}

/// Result of evaluating compliance rules and policies.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceOutcome {
    pub passed: bool,
    pub violations: Vec<Violation>,
}

impl Default for ComplianceOutcome {
    fn default() -> Self {
        Self::from_violations(Vec::new())
    }
}

impl ComplianceOutcome {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }
}

/// Every signal the scorer consumes, one per component.
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    pub verification: Signal<VerificationOutcome>,
    pub citations: Signal<CitationReport>,
    pub consistency: Signal<f64>,
    pub compliance: Signal<ComplianceOutcome>,
    pub clarity: Signal<f64>,
}

impl Default for Signals {
    /// A clean response: no claims, no citations, fully consistent, compliant and clear.
    fn default() -> Self {
        Self {
            verification: Signal::Ready(VerificationOutcome::default()),
            citations: Signal::Ready(CitationReport::default()),
            consistency: Signal::Ready(1.0),
            compliance: Signal::Ready(ComplianceOutcome::default()),
            clarity: Signal::Ready(1.0),
        }
    }
}

/// Scores the five components from their signals.
#[derive(Debug, Clone)]
pub struct ComponentScorer {
    weights: WeightConfig,
    short_response_tokens: usize,
}

impl ComponentScorer {
    pub fn new(weights: WeightConfig, short_response_tokens: usize) -> Self {
        Self {
            weights,
            short_response_tokens,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.weights, config.thresholds.short_response_tokens)
    }

    /// Score all five components, in component order.
    pub fn score_all(&self, signals: &Signals, token_count: usize) -> Vec<ComponentScore> {
        vec![
            self.fact_verification(&signals.verification),
            self.citation_validity(&signals.citations),
            self.consistency_check(&signals.consistency, token_count),
            self.compliance_policies(&signals.compliance),
            self.response_clarity(&signals.clarity),
        ]
    }

    pub fn fact_verification(&self, signal: &Signal<VerificationOutcome>) -> ComponentScore {
        let key = ComponentKey::FactVerification;
        let weight = self.weights.weight(key);

        let outcome = match signal {
            Signal::Ready(outcome) => outcome,
            Signal::Unavailable(reason) => {
                return ComponentScore::unscored(
                    key,
                    weight,
                    format!("claim verification unavailable: {}", reason),
                );
            }
        };

        let verified = outcome.count(VerificationStatus::Verified);
        let unverified = outcome.count(VerificationStatus::Unverified);
        let refuted = outcome.count(VerificationStatus::False);
        let resolved = outcome.results.len();
        let total = outcome.total();

        let component = if total == 0 {
            ComponentScore::scored(key, weight, 1.0)
        } else if resolved == 0 {
            ComponentScore::unscored(
                key,
                weight,
                format!("all {} claim verifications failed", total),
            )
        } else {
            ComponentScore::scored(key, weight, verified as f64 / resolved as f64)
        };

        let component = component
            .with_detail("verified", verified)
            .with_detail("unverified", unverified)
            .with_detail("false", refuted)
            .with_detail("total", total)
            .with_detail("unresolved", outcome.unresolved);

        if outcome.is_partial() {
            component.with_detail("partial", true)
        } else {
            component
        }
    }

    pub fn citation_validity(&self, signal: &Signal<CitationReport>) -> ComponentScore {
        let key = ComponentKey::CitationValidity;
        let weight = self.weights.weight(key);

        match signal {
            Signal::Ready(report) => {
                let score = if report.total > 0 {
                    report.valid.min(report.total) as f64 / report.total as f64
                } else {
                    1.0
                };
                ComponentScore::scored(key, weight, score)
                    .with_detail("valid", report.valid)
                    .with_detail("total", report.total)
                    .with_detail("invalid", report.invalid())
            }
            Signal::Unavailable(reason) => ComponentScore::unscored(
                key,
                weight,
                format!("citation validation unavailable: {}", reason),
            ),
        }
    }

    pub fn consistency_check(&self, signal: &Signal<f64>, token_count: usize) -> ComponentScore {
        let key = ComponentKey::ConsistencyCheck;
        let weight = self.weights.weight(key);

        match signal {
            Signal::Ready(raw) => {
                let raw = clamp_unit(*raw);
                let short = token_count < self.short_response_tokens;
                let score = if short {
                    raw.max(SHORT_RESPONSE_CONSISTENCY_FLOOR)
                } else {
                    raw
                };
                ComponentScore::scored(key, weight, score)
                    .with_detail("raw_score", raw)
                    .with_detail("short_response_floor", short)
            }
            Signal::Unavailable(reason) => ComponentScore::unscored(
                key,
                weight,
                format!("history lookup unavailable: {}", reason),
            ),
        }
    }

    pub fn compliance_policies(&self, signal: &Signal<ComplianceOutcome>) -> ComponentScore {
        let key = ComponentKey::CompliancePolicies;
        let weight = self.weights.weight(key);

        match signal {
            Signal::Ready(outcome) => {
                let count = outcome.violations.len();
                let score = if outcome.passed {
                    1.0
                } else {
                    (1.0 / (1.0 + count.max(1) as f64)).max(COMPLIANCE_FLOOR)
                };
                ComponentScore::scored(key, weight, score)
                    .with_detail("passed", outcome.passed)
                    .with_detail("violations", count)
            }
            Signal::Unavailable(reason) => ComponentScore::unscored(
                key,
                weight,
                format!("compliance evaluation unavailable: {}", reason),
            ),
        }
    }

    pub fn response_clarity(&self, signal: &Signal<f64>) -> ComponentScore {
        let key = ComponentKey::ResponseClarity;
        let weight = self.weights.weight(key);

        match signal {
            Signal::Ready(score) => ComponentScore::scored(key, weight, *score),
            Signal::Unavailable(reason) => ComponentScore::unscored(
                key,
                weight,
                format!("clarity scoring unavailable: {}", reason),
            ),
        }
    }
}

impl Default for ComponentScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Severity, ViolationKind};

    fn scorer() -> ComponentScorer {
        ComponentScorer::default()
    }

    fn results(statuses: &[VerificationStatus]) -> Vec<VerificationResult> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| VerificationResult::new(format!("claim {}", i), *s, 0.9, "kb"))
            .collect()
    }

    #[test]
    fn test_fact_verification_ratio() {
        let outcome = VerificationOutcome::complete(results(&[
            VerificationStatus::Verified,
            VerificationStatus::Verified,
            VerificationStatus::Unverified,
            VerificationStatus::False,
        ]));
        let c = scorer().fact_verification(&Signal::Ready(outcome));
        assert_eq!(c.score, Some(0.5));
        assert_eq!(c.count("verified"), 2);
        assert_eq!(c.count("false"), 1);
        assert!(!c.details.contains_key("partial"));
    }

    #[test]
    fn test_fact_verification_no_claims() {
        let c = scorer().fact_verification(&Signal::Ready(VerificationOutcome::default()));
        assert_eq!(c.score, Some(1.0));
    }

    #[test]
    fn test_fact_verification_partial() {
        let outcome = VerificationOutcome {
            results: results(&[VerificationStatus::Verified]),
            unresolved: 2,
        };
        let c = scorer().fact_verification(&Signal::Ready(outcome));
        assert_eq!(c.score, Some(1.0));
        assert_eq!(c.details.get("partial"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(c.count("unresolved"), 2);
        assert_eq!(c.count("total"), 3);
    }

    #[test]
    fn test_fact_verification_all_failed_is_unscored() {
        let outcome = VerificationOutcome {
            results: Vec::new(),
            unresolved: 3,
        };
        let c = scorer().fact_verification(&Signal::Ready(outcome));
        assert!(!c.is_scored());
        assert!(c.unscored_reason.unwrap().contains("all 3"));
    }

    #[test]
    fn test_citation_validity() {
        let report = CitationReport {
            total: 4,
            valid: 3,
            ..Default::default()
        };
        let c = scorer().citation_validity(&Signal::Ready(report));
        assert_eq!(c.score, Some(0.75));
        assert_eq!(c.count("invalid"), 1);

        let c = scorer().citation_validity(&Signal::Ready(CitationReport::default()));
        assert_eq!(c.score, Some(1.0));
    }

    #[test]
    fn test_consistency_floor_for_short_response() {
        let c = scorer().consistency_check(&Signal::Ready(0.03), 1);
        assert_eq!(c.score, Some(0.5));
        assert_eq!(c.details.get("raw_score"), Some(&serde_json::json!(0.03)));

        let c = scorer().consistency_check(&Signal::Ready(0.03), 12);
        assert_eq!(c.score, Some(0.03));
    }

    #[test]
    fn test_compliance_score() {
        let s = scorer();
        let passed = ComplianceOutcome::from_violations(Vec::new());
        assert_eq!(s.compliance_policies(&Signal::Ready(passed)).score, Some(1.0));

        let one = ComplianceOutcome::from_violations(vec![Violation::new(
            ViolationKind::Policy,
            Severity::Medium,
            "x",
        )]);
        assert_eq!(s.compliance_policies(&Signal::Ready(one)).score, Some(0.5));

        let many = ComplianceOutcome::from_violations(
            (0..20)
                .map(|_| Violation::new(ViolationKind::Compliance, Severity::Low, "x"))
                .collect(),
        );
        assert_eq!(s.compliance_policies(&Signal::Ready(many)).score, Some(0.1));
    }

    #[test]
    fn test_unavailable_signals_are_unscored() {
        let signals = Signals {
            verification: Signal::unavailable("down"),
            citations: Signal::unavailable("down"),
            consistency: Signal::unavailable("down"),
            compliance: Signal::unavailable("down"),
            clarity: Signal::unavailable("down"),
        };
        let scores = scorer().score_all(&signals, 10);
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|c| !c.is_scored()));
        assert!(scores.iter().all(|c| c.unscored_reason.is_some()));
    }

    #[test]
    fn test_scores_are_clamped() {
        let c = scorer().response_clarity(&Signal::Ready(1.4));
        assert_eq!(c.score, Some(1.0));
        let c = scorer().consistency_check(&Signal::Ready(-2.0), 10);
        assert_eq!(c.score, Some(0.0));
    }
}
