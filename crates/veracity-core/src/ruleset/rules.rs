//! Compliance rule evaluation.
//!
//! Checks run in a fixed order and the first failing check decides:
//! forbidden text, then required text, then keywords or patterns.

use regex::RegexBuilder;

use super::parser::{ComplianceRule, MatchType};
use crate::types::{Violation, ViolationDetail};

/// Evaluate one rule. Returns the violation if the response breaks it.
pub fn check_rule(rule: &ComplianceRule, response: &str) -> Option<Violation> {
    if !rule.active {
        return None;
    }

    let lowered = response.to_lowercase();

    let forbidden: Vec<String> = rule
        .forbidden_text
        .iter()
        .filter(|t| lowered.contains(&t.to_lowercase()))
        .cloned()
        .collect();
    if let Some(first) = forbidden.first() {
        let details = format!("Response contains forbidden text: '{}'", first);
        return Some(violation(rule, details, forbidden));
    }

    let missing: Vec<String> = rule
        .required_text
        .iter()
        .filter(|t| !lowered.contains(&t.to_lowercase()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        let details = format!("Response missing required text: {}", missing.join(", "));
        return Some(violation(rule, details, missing));
    }

    match rule.match_type {
        MatchType::Keyword => {
            let matched: Vec<String> = rule
                .keywords
                .iter()
                .filter(|k| lowered.contains(&k.to_lowercase()))
                .cloned()
                .collect();
            if matched.is_empty() {
                return None;
            }
            let details = format!(
                "Response contains prohibited keywords: {}",
                matched.join(", ")
            );
            Some(violation(rule, details, matched))
        }
        MatchType::Pattern => {
            let matched: Vec<String> = rule
                .patterns
                .iter()
                .filter(|pattern| pattern_matches(rule, pattern, response))
                .cloned()
                .collect();
            if matched.is_empty() {
                return None;
            }
            let details = format!(
                "Response matches prohibited patterns: {}",
                matched.join(", ")
            );
            Some(violation(rule, details, matched))
        }
    }
}

/// Evaluate every active rule, in ruleset order.
pub fn check_rules<'a>(
    rules: impl IntoIterator<Item = &'a ComplianceRule>,
    response: &str,
) -> Vec<Violation> {
    rules
        .into_iter()
        .filter_map(|rule| check_rule(rule, response))
        .collect()
}

fn pattern_matches(rule: &ComplianceRule, pattern: &str, response: &str) -> bool {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(response),
        Err(e) => {
            tracing::warn!(rule = %rule.id, pattern, error = %e, "Skipping invalid rule pattern");
            false
        }
    }
}

fn violation(rule: &ComplianceRule, details: String, matched: Vec<String>) -> Violation {
    Violation::new(
        rule.violation_kind(),
        rule.severity,
        format!("{}: {}", rule.name, details),
    )
    .with_detail(ViolationDetail {
        rule_id: Some(rule.id.clone()),
        rule_name: Some(rule.name.clone()),
        rule_text: Some(rule.rule_text().to_string()),
        matched,
        expected: None,
    })
}
