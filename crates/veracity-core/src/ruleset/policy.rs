//! Policy matching.
//!
//! Flags responses whose wording opposes a policy (the policy says "always",
//! the response says "never") and, for refund policies, responses that promise
//! a faster turnaround than the policy allows.

use lazy_static::lazy_static;
use regex::Regex;

use super::parser::Policy;
use crate::text::Phrase;
use crate::types::{Severity, Violation, ViolationDetail, ViolationKind};

/// Term pairs that contradict each other across policy and response.
pub const OPPOSITE_TERMS: &[(&str, &str)] = &[
    ("always", "never"),
    ("guaranteed", "cannot guarantee"),
    ("immediate", "within"),
    ("free", "charge"),
];

lazy_static! {
    static ref OPPOSITE_PHRASES: Vec<(Phrase, Phrase)> = OPPOSITE_TERMS
        .iter()
        .map(|(a, b)| (Phrase::new(a).unwrap(), Phrase::new(b).unwrap()))
        .collect();

    static ref TIME_PROMISE: Regex = Regex::new(
        r"(?i)\b(\d+)(?:\s*-\s*\d+)?\s*(?:business\s+|working\s+)?(day|hour|minute|week)s?\b"
    )
    .unwrap();
}

/// A turnaround time stated in text.
#[derive(Debug, Clone, PartialEq)]
struct TimePromise {
    /// Lower bound, in days
    days: f64,
    /// The text as written, e.g. "7-10 business days"
    fragment: String,
}

/// A term pair found on opposite sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contradiction {
    pub policy_term: &'static str,
    pub response_term: &'static str,
}

impl Contradiction {
    pub fn describe(&self) -> String {
        format!(
            "Policy uses '{}' but response uses '{}'",
            self.policy_term, self.response_term
        )
    }
}

/// Opposite-term pairs between policy text and response, in pair order.
pub fn find_contradictions(policy_text: &str, response: &str) -> Vec<Contradiction> {
    let mut found = Vec::new();
    for (&(a, b), (phrase_a, phrase_b)) in OPPOSITE_TERMS.iter().zip(OPPOSITE_PHRASES.iter()) {
        if phrase_a.is_match(policy_text) && phrase_b.is_match(response) {
            found.push(Contradiction {
                policy_term: a,
                response_term: b,
            });
        } else if phrase_b.is_match(policy_text) && phrase_a.is_match(response) {
            found.push(Contradiction {
                policy_term: b,
                response_term: a,
            });
        }
    }
    found
}

/// Check one policy. At most one violation per policy.
pub fn check_policy(policy: &Policy, response: &str) -> Option<Violation> {
    if !policy.active {
        return None;
    }

    if let Some(first) = find_contradictions(&policy.content, response).into_iter().next() {
        let description = format!(
            "Response contradicts policy '{}': {}",
            policy.name,
            first.describe()
        );
        return Some(
            Violation::new(ViolationKind::Policy, Severity::Medium, description).with_detail(
                detail(policy, vec![first.response_term.to_string()], None),
            ),
        );
    }

    if policy.category.to_lowercase().contains("refund") {
        let promised = first_promise(response);
        let allowed = first_promise(&policy.content);
        if let (Some(promised), Some(allowed)) = (promised, allowed) {
            if promised.days < allowed.days {
                let description = format!(
                    "Response promises {} days but policy allows {} days",
                    promised.days, allowed.days
                );
                return Some(
                    Violation::new(ViolationKind::Policy, Severity::High, description).with_detail(
                        detail(policy, vec![promised.fragment], Some(allowed.fragment)),
                    ),
                );
            }
        }
    }

    None
}

/// Check every active policy, in ruleset order.
pub fn check_policies<'a>(
    policies: impl IntoIterator<Item = &'a Policy>,
    response: &str,
) -> Vec<Violation> {
    policies
        .into_iter()
        .filter_map(|policy| check_policy(policy, response))
        .collect()
}

/// First day/hour/week quantity in the text. Minutes are not counted as a
/// promise, and a range counts from its lower bound.
fn first_promise(text: &str) -> Option<TimePromise> {
    TIME_PROMISE.captures_iter(text).find_map(|caps| {
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        let days = match caps.get(2)?.as_str().to_lowercase().as_str() {
            "day" => value,
            "hour" => value / 24.0,
            "week" => value * 7.0,
            _ => return None,
        };
        Some(TimePromise {
            days,
            fragment: caps.get(0)?.as_str().to_string(),
        })
    })
}

fn detail(policy: &Policy, matched: Vec<String>, expected: Option<String>) -> ViolationDetail {
    ViolationDetail {
        rule_id: Some(policy.id.clone()),
        rule_name: Some(policy.name.clone()),
        rule_text: Some(policy.content.clone()),
        matched,
        expected,
    }
}
