//! Status decision engine.
//!
//! The final status comes from an ordered list of rules; the first rule whose
//! condition holds decides. The standard policy:
//! 1. Any CRITICAL violation → BLOCKED
//! 2. Any HIGH violation, with at least one real violation → BLOCKED
//! 3. Any real violation → FLAGGED
//! 4. Only consistency violations → APPROVED
//! 5. Short response (fewer than 3 tokens) → APPROVED
//! 6. No component could be scored → FLAGGED
//! 7. Confidence below 0.50 → BLOCKED
//! 8. Confidence below 0.70 → FLAGGED
//! 9. Otherwise → APPROVED
//!
//! Violations always outrank the score. Short responses are exempt from
//! score-based outcomes because there is too little text to score.

use serde::{Deserialize, Serialize};

use crate::types::{Severity, Status, Violation, ViolationKind};

/// Numeric cut-offs used by the standard policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    /// Confidence below this blocks
    pub block_below: f64,

    /// Confidence below this flags
    pub flag_below: f64,

    /// Responses with fewer tokens than this are short
    pub short_response_tokens: usize,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            block_below: 0.50,
            flag_below: 0.70,
            short_response_tokens: 3,
        }
    }
}

/// What a decision rule looks at.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub violations: &'a [Violation],
    pub total_score: f64,
    pub token_count: usize,
    pub scored_components: usize,
}

/// A condition over [`DecisionInput`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Any violation with exactly this severity
    AnySeverity(Severity),

    /// Any violation with this severity, and at least one real violation
    SeverityWithRealViolation(Severity),

    AnyRealViolation,

    /// At least one violation, all of them consistency
    OnlyConsistencyViolations,

    /// Token count strictly below the limit
    ShortResponse(usize),

    NothingScored,

    /// Total score strictly below the threshold
    ScoreBelow(f64),

    Always,
}

impl RuleCondition {
    pub fn matches(&self, input: &DecisionInput<'_>) -> bool {
        match *self {
            RuleCondition::AnySeverity(severity) => {
                input.violations.iter().any(|v| v.severity == severity)
            }
            RuleCondition::SeverityWithRealViolation(severity) => {
                input.violations.iter().any(|v| v.severity == severity)
                    && input.violations.iter().any(Violation::is_real)
            }
            RuleCondition::AnyRealViolation => input.violations.iter().any(Violation::is_real),
            RuleCondition::OnlyConsistencyViolations => {
                !input.violations.is_empty()
                    && input
                        .violations
                        .iter()
                        .all(|v| v.kind == ViolationKind::Consistency)
            }
            RuleCondition::ShortResponse(limit) => input.token_count < limit,
            RuleCondition::NothingScored => input.scored_components == 0,
            RuleCondition::ScoreBelow(threshold) => input.total_score < threshold,
            RuleCondition::Always => true,
        }
    }
}

/// A named rule mapping a condition to an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRule {
    pub name: String,
    pub condition: RuleCondition,
    pub outcome: Status,
}

impl StatusRule {
    pub fn new(name: &str, condition: RuleCondition, outcome: Status) -> Self {
        Self {
            name: name.to_string(),
            condition,
            outcome,
        }
    }
}

/// The status together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: Status,
    pub rule: String,
}

/// Ordered status rules. First match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPolicy {
    rules: Vec<StatusRule>,
}

impl StatusPolicy {
    /// Name reported when no rule matches. The standard policy always ends
    /// in a catch-all, so this only shows up for custom rule lists.
    pub const NO_MATCH: &'static str = "no_rule_matched";

    pub fn new(rules: Vec<StatusRule>) -> Self {
        Self { rules }
    }

    pub fn standard(thresholds: &DecisionThresholds) -> Self {
        Self::new(vec![
            StatusRule::new(
                "critical_violation",
                RuleCondition::AnySeverity(Severity::Critical),
                Status::Blocked,
            ),
            StatusRule::new(
                "high_severity_real_violation",
                RuleCondition::SeverityWithRealViolation(Severity::High),
                Status::Blocked,
            ),
            StatusRule::new("real_violation", RuleCondition::AnyRealViolation, Status::Flagged),
            StatusRule::new(
                "consistency_only",
                RuleCondition::OnlyConsistencyViolations,
                Status::Approved,
            ),
            StatusRule::new(
                "short_response",
                RuleCondition::ShortResponse(thresholds.short_response_tokens),
                Status::Approved,
            ),
            StatusRule::new("nothing_scored", RuleCondition::NothingScored, Status::Flagged),
            StatusRule::new(
                "score_below_block",
                RuleCondition::ScoreBelow(thresholds.block_below),
                Status::Blocked,
            ),
            StatusRule::new(
                "score_below_flag",
                RuleCondition::ScoreBelow(thresholds.flag_below),
                Status::Flagged,
            ),
            StatusRule::new("default", RuleCondition::Always, Status::Approved),
        ])
    }

    pub fn rules(&self) -> &[StatusRule] {
        &self.rules
    }

    pub fn decide(&self, input: &DecisionInput<'_>) -> Decision {
        let decision = self
            .rules
            .iter()
            .find(|rule| rule.condition.matches(input))
            .map(|rule| Decision {
                status: rule.outcome,
                rule: rule.name.clone(),
            })
            .unwrap_or_else(|| Decision {
                status: Status::Flagged,
                rule: Self::NO_MATCH.to_string(),
            });

        tracing::debug!(
            status = decision.status.as_str(),
            rule = %decision.rule,
            total_score = input.total_score,
            violations = input.violations.len(),
            "Status decided"
        );

        decision
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::standard(&DecisionThresholds::default())
    }
}
