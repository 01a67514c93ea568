//! Plain-text explanation of a decision.
//!
//! Built only from the decision inputs and the breakdown, so the explanation
//! never says anything the result does not also carry as data.

use std::fmt::Write;

use crate::scoring::{ComponentKey, ConfidenceBreakdown};
use crate::types::{Degradation, Status, Violation};

/// Inputs to an explanation.
#[derive(Debug, Clone, Copy)]
pub struct ExplanationInput<'a> {
    pub status: Status,
    pub decided_by: &'a str,
    pub breakdown: &'a ConfidenceBreakdown,
    pub violations: &'a [Violation],
    pub degradations: &'a [Degradation],
}

/// Confidence band wording.
pub fn confidence_band(score: f64) -> &'static str {
    if score >= 0.8 {
        "High confidence in validation results."
    } else if score >= 0.6 {
        "Moderate confidence in validation results."
    } else {
        "Low confidence in validation results - manual review recommended."
    }
}

pub fn explain(input: &ExplanationInput<'_>) -> String {
    let mut out = String::new();
    let pct = (input.breakdown.total_score * 100.0).round() as i64;

    let headline = match input.status {
        Status::Approved => "Response approved",
        Status::Flagged => "Response flagged for review",
        Status::Blocked => "Response blocked",
    };
    // writing to a String cannot fail
    let _ = writeln!(out, "{} (confidence {}%).", headline, pct);
    let _ = writeln!(out, "{}", confidence_band(input.breakdown.total_score));

    if !input.violations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Issues detected ({}):", input.violations.len());
        for (i, v) in input.violations.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{}] {}: {}",
                i + 1,
                v.severity.as_str().to_uppercase(),
                v.kind,
                v.description
            );
        }
    }

    if let Some(fact) = input.breakdown.component(ComponentKey::FactVerification) {
        if fact.count("total") > 0 {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Fact verification: {} verified, {} unverified, {} false{}.",
                fact.count("verified"),
                fact.count("unverified"),
                fact.count("false"),
                match fact.count("unresolved") {
                    0 => String::new(),
                    n => format!(", {} unresolved", n),
                }
            );
        }
    }

    if !input.degradations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Degraded components:");
        for d in input.degradations {
            let _ = writeln!(out, "- {}: {}", d.component, d.message);
        }
    }

    let _ = writeln!(out);
    let _ = write!(out, "Decided by rule: {}", input.decided_by);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ComponentScore, ConfidenceAggregator, WeightConfig};
    use crate::types::{Severity, ViolationKind};

    fn breakdown(score: f64) -> ConfidenceBreakdown {
        let weights = WeightConfig::default();
        let components = ComponentKey::ALL
            .iter()
            .map(|k| ComponentScore::scored(*k, weights.weight(*k), score))
            .collect();
        ConfidenceAggregator::new(weights).aggregate(components)
    }

    #[test]
    fn test_approved_explanation() {
        let b = breakdown(0.9);
        let text = explain(&ExplanationInput {
            status: Status::Approved,
            decided_by: "default",
            breakdown: &b,
            violations: &[],
            degradations: &[],
        });
        assert!(text.starts_with("Response approved (confidence 90%)."));
        assert!(text.contains("High confidence"));
        assert!(text.ends_with("Decided by rule: default"));
        assert!(!text.contains("Issues detected"));
    }

    #[test]
    fn test_lists_violations() {
        let b = breakdown(0.6);
        let violations = vec![Violation::new(
            ViolationKind::Policy,
            Severity::Medium,
            "Response contradicts policy",
        )];
        let text = explain(&ExplanationInput {
            status: Status::Flagged,
            decided_by: "real_violation",
            breakdown: &b,
            violations: &violations,
            degradations: &[],
        });
        assert!(text.contains("Issues detected (1):"));
        assert!(text.contains("1. [MEDIUM] policy: Response contradicts policy"));
        assert!(text.contains("Moderate confidence"));
    }

    #[test]
    fn test_confidence_band() {
        assert!(confidence_band(0.3).starts_with("Low"));
        assert!(confidence_band(0.65).starts_with("Moderate"));
        assert!(confidence_band(0.8).starts_with("High"));
    }
}
