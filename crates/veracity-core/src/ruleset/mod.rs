//! Rulesets: compliance rules and organization policies.
//!
//! Rulesets are plain YAML/JSON documents. This module parses them and
//! evaluates responses against them without any external service.

mod parser;
mod policy;
mod rules;

pub use parser::{
    ComplianceRule, MatchType, Policy, RuleAction, RuleType, Ruleset, RulesetError,
};
pub use policy::{check_policies, check_policy, find_contradictions, Contradiction, OPPOSITE_TERMS};
pub use rules::{check_rule, check_rules};

use crate::scoring::ComplianceOutcome;

/// Evaluate a response against every active rule, then every active policy.
pub fn check_compliance(ruleset: &Ruleset, response: &str) -> ComplianceOutcome {
    let mut violations = check_rules(ruleset.active_rules(), response);
    violations.extend(check_policies(ruleset.active_policies(), response));

    tracing::debug!(
        ruleset = %ruleset.name,
        violations = violations.len(),
        "Checked compliance"
    );

    ComplianceOutcome::from_violations(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Severity, ViolationKind};

    #[test]
    fn test_rules_then_policies() {
        let ruleset = Ruleset::from_yaml(
            r#"
name: combined
compliance_rules:
  - id: SEC-1
    name: No financial guarantees
    severity: critical
    keywords: ["guarantee"]
policies:
  - id: P1
    name: Risk Disclosure
    content: Always disclose risk
"#,
        )
        .unwrap();

        let outcome = check_compliance(&ruleset, "we never guarantee returns");
        assert!(!outcome.passed);
        assert_eq!(outcome.violations.len(), 2);
        assert_eq!(outcome.violations[0].kind, ViolationKind::Compliance);
        assert_eq!(outcome.violations[0].severity, Severity::Critical);
        assert_eq!(outcome.violations[1].kind, ViolationKind::Policy);
    }

    #[test]
    fn test_empty_ruleset_passes() {
        let outcome = check_compliance(&Ruleset::empty("none"), "anything");
        assert!(outcome.passed);
        assert!(outcome.violations.is_empty());
    }
}
