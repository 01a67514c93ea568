//! The scoring and decision pipeline.
//!
//! [`Engine::assess_at`] is pure: the same response, signals and timestamp
//! always produce the same [`DetectionResult`]. Signal collection (claim
//! verification, history lookup, ...) happens before it, either through the
//! built-in heuristics ([`Engine::evaluate_at`]) or through the async runtime.

use chrono::{DateTime, Utc};

use crate::consistency::ConsistencyComparator;
use crate::decision::{DecisionInput, StatusPolicy};
use crate::explanation::{explain, ExplanationInput};
use crate::heuristics::{check_citations, clarity_score, extract_claims, invalid_citation_violation};
use crate::ruleset::check_compliance;
use crate::scoring::{
    ComponentKey, ComponentScorer, ConfidenceAggregator, ScoringConfig, Signal, Signals,
    VerificationOutcome,
};
use crate::text;
use crate::types::{
    Degradation, DetectionResult, Severity, VerificationStatus, Violation, ViolationDetail,
    ViolationKind,
};
use crate::{EvaluationContext, EvaluationError};

/// Consistency scores below this raise a consistency violation.
pub const CONSISTENCY_VIOLATION_BELOW: f64 = 0.5;

/// Scores signals and decides a status.
#[derive(Debug, Clone)]
pub struct Engine {
    config: ScoringConfig,
    scorer: ComponentScorer,
    aggregator: ConfidenceAggregator,
    policy: StatusPolicy,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl Engine {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            scorer: ComponentScorer::from_config(&config),
            aggregator: ConfidenceAggregator::new(config.weights),
            policy: StatusPolicy::standard(&config.thresholds),
        }
    }

    /// Replace the status policy.
    pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn policy(&self) -> &StatusPolicy {
        &self.policy
    }

    /// Assess a response from already collected signals, timestamped now.
    pub fn assess(&self, response: &str, signals: Signals) -> DetectionResult {
        self.assess_at(response, signals, Utc::now())
    }

    /// Assess a response from already collected signals.
    pub fn assess_at(
        &self,
        response: &str,
        signals: Signals,
        evaluated_at: DateTime<Utc>,
    ) -> DetectionResult {
        let token_count = text::token_count(response);

        let scores = self.scorer.score_all(&signals, token_count);
        let breakdown = self.aggregator.aggregate(scores);

        let violations = collect_violations(&signals, &breakdown);
        let degradations = collect_degradations(&signals);

        let decision = self.policy.decide(&DecisionInput {
            violations: &violations,
            total_score: breakdown.total_score,
            token_count,
            scored_components: breakdown.scored_count(),
        });

        let explanation = explain(&ExplanationInput {
            status: decision.status,
            decided_by: &decision.rule,
            breakdown: &breakdown,
            violations: &violations,
            degradations: &degradations,
        });

        let verification_results = match signals.verification {
            Signal::Ready(outcome) => outcome.results,
            Signal::Unavailable(_) => Vec::new(),
        };

        tracing::info!(
            status = decision.status.as_str(),
            rule = %decision.rule,
            confidence = breakdown.total_score,
            violations = violations.len(),
            degraded = degradations.len(),
            "Response assessed"
        );

        DetectionResult {
            status: decision.status,
            confidence_score: breakdown.total_score,
            violations,
            verification_results,
            breakdown,
            explanation,
            decided_by: decision.rule,
            token_count,
            degradations,
            evaluated_at,
        }
    }

    /// Evaluate with the built-in heuristics, timestamped now.
    pub fn evaluate(
        &self,
        query: &str,
        response: &str,
        context: &EvaluationContext,
    ) -> Result<DetectionResult, EvaluationError> {
        self.evaluate_at(query, response, context, Utc::now())
    }

    /// Evaluate with the built-in heuristics.
    ///
    /// Claims are extracted from the response, but verifying them needs an
    /// external source: unless `context.verification` carries results, a
    /// response with claims leaves fact verification unscored.
    pub fn evaluate_at(
        &self,
        query: &str,
        response: &str,
        context: &EvaluationContext,
        evaluated_at: DateTime<Utc>,
    ) -> Result<DetectionResult, EvaluationError> {
        validate_response(response)?;

        tracing::debug!(
            query_len = query.len(),
            response_len = response.len(),
            ruleset = %context.ruleset.name,
            "Evaluating response"
        );

        let verification = match &context.verification {
            Some(outcome) => Signal::Ready(outcome.clone()),
            None => {
                let claims = extract_claims(response);
                if claims.is_empty() {
                    Signal::Ready(VerificationOutcome::default())
                } else {
                    Signal::unavailable(format!(
                        "no claim verifier configured for {} claims",
                        claims.len()
                    ))
                }
            }
        };

        let signals = Signals {
            verification,
            citations: Signal::Ready(check_citations(response)),
            consistency: Signal::Ready(ConsistencyComparator::new().compare(response, &context.history)),
            compliance: Signal::Ready(check_compliance(&context.ruleset, response)),
            clarity: Signal::Ready(clarity_score(response)),
        };

        Ok(self.assess_at(response, signals, evaluated_at))
    }
}

/// Reject empty or whitespace-only responses.
pub fn validate_response(response: &str) -> Result<(), EvaluationError> {
    if response.trim().is_empty() {
        return Err(EvaluationError::MalformedInput(
            "response is empty or whitespace-only".to_string(),
        ));
    }
    Ok(())
}

/// Violations in reporting order: compliance and policy, hallucination,
/// citation, consistency.
fn collect_violations(
    signals: &Signals,
    breakdown: &crate::scoring::ConfidenceBreakdown,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if let Some(compliance) = signals.compliance.as_ready() {
        violations.extend(compliance.violations.iter().cloned());
    }

    if let Some(outcome) = signals.verification.as_ready() {
        for result in outcome
            .results
            .iter()
            .filter(|r| r.status == VerificationStatus::False)
        {
            violations.push(
                Violation::new(
                    ViolationKind::Hallucination,
                    Severity::High,
                    format!("Claim contradicted by {}: {}", result.source, result.claim),
                )
                .with_detail(ViolationDetail {
                    matched: vec![result.claim.clone()],
                    ..Default::default()
                }),
            );
        }
    }

    if let Some(report) = signals.citations.as_ready() {
        violations.extend(invalid_citation_violation(report));
    }

    if let Some(score) = breakdown.score_of(ComponentKey::ConsistencyCheck) {
        if score < CONSISTENCY_VIOLATION_BELOW {
            violations.push(Violation::new(
                ViolationKind::Consistency,
                Severity::Medium,
                format!(
                    "Response differs from prior responses in this context ({:.0}% similarity)",
                    score * 100.0
                ),
            ));
        }
    }

    violations
}

fn collect_degradations(signals: &Signals) -> Vec<Degradation> {
    let mut degradations = Vec::new();

    match &signals.verification {
        Signal::Unavailable(reason) => {
            degradations.push(Degradation::unavailable(ComponentKey::FactVerification, reason))
        }
        Signal::Ready(outcome) if outcome.unresolved > 0 => {
            if outcome.results.is_empty() {
                degradations.push(Degradation::unavailable(
                    ComponentKey::FactVerification,
                    format!("all {} claim verifications failed", outcome.unresolved),
                ));
            } else {
                degradations.push(Degradation::partial(
                    ComponentKey::FactVerification,
                    format!(
                        "{} of {} claims could not be verified",
                        outcome.unresolved,
                        outcome.total()
                    ),
                ));
            }
        }
        Signal::Ready(_) => {}
    }

    let others = [
        (ComponentKey::CitationValidity, unavailable_reason(&signals.citations)),
        (ComponentKey::ConsistencyCheck, unavailable_reason(&signals.consistency)),
        (ComponentKey::CompliancePolicies, unavailable_reason(&signals.compliance)),
        (ComponentKey::ResponseClarity, unavailable_reason(&signals.clarity)),
    ];
    for (key, reason) in others {
        if let Some(reason) = reason {
            degradations.push(Degradation::unavailable(key, reason));
        }
    }

    degradations
}

fn unavailable_reason<T>(signal: &Signal<T>) -> Option<&str> {
    match signal {
        Signal::Unavailable(reason) => Some(reason),
        Signal::Ready(_) => None,
    }
}
