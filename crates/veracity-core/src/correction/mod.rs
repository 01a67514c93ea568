//! Correction engine.
//!
//! Best-effort rewriting of a response that violates a policy or compliance
//! rule. A violation gets a targeted rewrite when it carries enough detail:
//! a time promise is replaced with the policy's own wording, guarantee
//! language is hedged, and opposing polarity ("always" vs "never") is
//! flipped. Financial compliance violations also get a disclaimer. Anything
//! else gets a neutral compliance note. The engine never fails.

mod patterns;

pub use patterns::{PatternTable, PatternTableBuilder};

use std::borrow::Cow;

use lazy_static::lazy_static;

use crate::text::Phrase;
use crate::types::{CorrectionResult, Violation, ViolationDetail, ViolationKind};

/// Appended when no targeted rewrite applies.
pub const COMPLIANCE_NOTE: &str =
    "Note: Please refer to our official policy documentation for complete and accurate details.";

/// Appended for violations of financial or securities rules.
pub const FINANCIAL_DISCLAIMER: &str = "Note: This is not financial advice. Please consult a licensed financial advisor. Past performance does not guarantee future results.";

const TO_ALWAYS: &str =
    "Aligned language with policy (changed 'never' to 'always' to match policy)";
const TO_NEVER: &str =
    "Aligned language with policy (changed 'always' to 'never' to match policy)";
const HEDGED: &str = "Removed guarantee language";

lazy_static! {
    static ref TOWARD_ALWAYS: PatternTable = PatternTable::builder()
        .rewrite("we never", "we always", TO_ALWAYS)
        .rewrite("we do not", "we always", TO_ALWAYS)
        .rewrite("we don't", "we always", TO_ALWAYS)
        .rewrite("we will never", "we will always", TO_ALWAYS)
        .rewrite("never", "always", TO_ALWAYS)
        .build()
        .unwrap();

    static ref TOWARD_NEVER: PatternTable = PatternTable::builder()
        .rewrite("we always", "we never", TO_NEVER)
        .rewrite("always", "never", TO_NEVER)
        .build()
        .unwrap();

    static ref GUARANTEES: PatternTable = PatternTable::builder()
        .rewrite("guaranteed returns", "potential returns", HEDGED)
        .rewrite("guaranteed profits", "potential profits", HEDGED)
        .rewrite("always profitable", "potentially profitable", HEDGED)
        .rewrite("risk-free", "lower-risk", HEDGED)
        .rewrite("sure thing", "reasonable option", HEDGED)
        .rewrite("cannot lose", "could still lose", HEDGED)
        .rewrite("guaranteed", "typically", HEDGED)
        .build()
        .unwrap();

    static ref ALWAYS: Phrase = Phrase::new("always").unwrap();
    static ref NEVER: Phrase = Phrase::new("never").unwrap();

    static ref DEFAULT_ENGINE: CorrectionEngine = CorrectionEngine::default();
}

/// Which way a rule pushes the response's wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Always,
    Never,
}

impl Polarity {
    fn of_rule(rule_text: &str) -> Option<Self> {
        if ALWAYS.is_match(rule_text) {
            Some(Polarity::Always)
        } else if NEVER.is_match(rule_text) {
            Some(Polarity::Never)
        } else {
            None
        }
    }

    /// The word a response uses when it contradicts this polarity.
    fn opposite(&self) -> &'static Phrase {
        match self {
            Polarity::Always => &*NEVER,
            Polarity::Never => &*ALWAYS,
        }
    }
}

/// A targeted fix chosen from a violation's detail.
struct Rewrite<'a> {
    table: Cow<'a, PatternTable>,
    /// The objected-to wording is still in the response
    pending: bool,
}

/// Rewrites responses to address fixable violations.
#[derive(Debug, Clone)]
pub struct CorrectionEngine {
    toward_always: PatternTable,
    toward_never: PatternTable,
    guarantees: PatternTable,
    note: String,
    financial_disclaimer: String,
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self {
            toward_always: TOWARD_ALWAYS.clone(),
            toward_never: TOWARD_NEVER.clone(),
            guarantees: GUARANTEES.clone(),
            note: COMPLIANCE_NOTE.to_string(),
            financial_disclaimer: FINANCIAL_DISCLAIMER.to_string(),
        }
    }
}

impl CorrectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the polarity tables.
    pub fn with_tables(mut self, toward_always: PatternTable, toward_never: PatternTable) -> Self {
        self.toward_always = toward_always;
        self.toward_never = toward_never;
        self
    }

    /// Replace the table that hedges guarantee language.
    pub fn with_guarantee_table(mut self, guarantees: PatternTable) -> Self {
        self.guarantees = guarantees;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_financial_disclaimer(mut self, disclaimer: impl Into<String>) -> Self {
        self.financial_disclaimer = disclaimer.into();
        self
    }

    /// Correct a response for a single violation.
    ///
    /// A violation whose objected-to wording is already gone from the
    /// response leaves it unchanged, so correcting twice is a no-op.
    pub fn correct(&self, response: &str, violation: &Violation) -> CorrectionResult {
        if !matches!(
            violation.kind,
            ViolationKind::Policy | ViolationKind::Compliance
        ) {
            return CorrectionResult::unchanged(response);
        }

        let financial = is_financial(violation);

        let (mut corrected, mut changes) = match self.rewrite_for(response, violation) {
            Some(rewrite) if rewrite.table.is_match(response) => rewrite.table.apply(response),
            Some(rewrite) if !rewrite.pending => (response.to_string(), Vec::new()),
            _ if financial => (response.to_string(), Vec::new()),
            _ => append(response, &self.note, "Added compliance note"),
        };

        if financial {
            let (text, added) =
                append(&corrected, &self.financial_disclaimer, "Added financial disclaimer");
            corrected = text;
            changes.extend(added);
        }

        finish(response, corrected, changes)
    }

    /// Correct a response for every violation in turn.
    pub fn correct_all<'a>(
        &self,
        response: &str,
        violations: impl IntoIterator<Item = &'a Violation>,
    ) -> CorrectionResult {
        let mut current = response.to_string();
        let mut changes = Vec::new();

        for violation in violations {
            let step = self.correct(&current, violation);
            if step.changed {
                current = step.corrected;
                changes.extend(step.changes);
            }
        }

        finish(response, current, changes)
    }

    /// Pick the targeted rewrite for a violation, most specific first:
    /// the rule's expected wording, then guarantee hedging, then polarity.
    fn rewrite_for<'a>(&'a self, response: &str, violation: &Violation) -> Option<Rewrite<'a>> {
        let detail = violation.detail.as_ref();
        let matched = detail.map(|d| d.matched.as_slice()).unwrap_or_default();

        if let Some(table) = detail.and_then(expected_table) {
            return Some(Rewrite {
                table: Cow::Owned(table),
                pending: mentions_any(response, matched),
            });
        }

        if matched.iter().any(|m| self.guarantees.is_match(m)) {
            return Some(Rewrite {
                table: Cow::Borrowed(&self.guarantees),
                pending: mentions_any(response, matched),
            });
        }

        let polarity = violation.rule_text().and_then(Polarity::of_rule)?;
        let opposite = polarity.opposite();
        let contradicted = if matched.is_empty() {
            opposite.is_match(response)
        } else {
            matched.iter().any(|m| opposite.is_match(m))
        };
        if !contradicted {
            return None;
        }

        let table = match polarity {
            Polarity::Always => &self.toward_always,
            Polarity::Never => &self.toward_never,
        };
        Some(Rewrite {
            table: Cow::Borrowed(table),
            pending: opposite.is_match(response),
        })
    }
}

/// Replace each matched fragment with the wording the rule expects.
fn expected_table(detail: &ViolationDetail) -> Option<PatternTable> {
    let expected = detail.expected.as_deref()?;
    if detail.matched.is_empty() {
        return None;
    }
    let description = format!("Adjusted time promise to match policy ({})", expected);
    let builder = detail
        .matched
        .iter()
        .fold(PatternTable::builder(), |builder, fragment| {
            builder.rewrite(fragment, expected, description.clone())
        });
    match builder.build() {
        Ok(table) => Some(table),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping expected-wording rewrite");
            None
        }
    }
}

/// Compliance violations of securities or financial rules.
fn is_financial(violation: &Violation) -> bool {
    if violation.kind != ViolationKind::Compliance {
        return false;
    }
    let Some(detail) = violation.detail.as_ref() else {
        return false;
    };
    let sec_rule = detail
        .rule_id
        .as_deref()
        .is_some_and(|id| id.to_uppercase().starts_with("SEC"));
    let financial_name = detail.rule_name.as_deref().is_some_and(|name| {
        let name = name.to_lowercase();
        name.contains("financial") || name.contains("investment")
    });
    sec_rule || financial_name
}

fn mentions_any(response: &str, fragments: &[String]) -> bool {
    let lowered = response.to_lowercase();
    fragments
        .iter()
        .any(|f| lowered.contains(&f.to_lowercase()))
}

/// Append a paragraph unless the text already carries it.
fn append(text: &str, paragraph: &str, change: &str) -> (String, Vec<String>) {
    if text.contains(paragraph) {
        return (text.to_string(), Vec::new());
    }
    let appended = format!("{}\n\n{}", text.trim_end(), paragraph);
    (appended, vec![change.to_string()])
}

/// Enforce the result invariant: `changed` iff the trimmed texts differ, and
/// an unchanged text reports no changes.
fn finish(original: &str, corrected: String, mut changes: Vec<String>) -> CorrectionResult {
    let changed = original.trim() != corrected.trim();
    if !changed {
        return CorrectionResult::unchanged(original);
    }
    changes.dedup();
    tracing::debug!(changes = changes.len(), "Corrected response");
    CorrectionResult {
        original: original.to_string(),
        corrected,
        changes,
        changed,
    }
}

/// Correct a response for one violation with the default engine.
pub fn correct(response: &str, violation: &Violation) -> CorrectionResult {
    DEFAULT_ENGINE.correct(response, violation)
}

/// Correct a response for every violation with the default engine.
pub fn correct_all<'a>(
    response: &str,
    violations: impl IntoIterator<Item = &'a Violation>,
) -> CorrectionResult {
    DEFAULT_ENGINE.correct_all(response, violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::{check_compliance, Ruleset};
    use crate::types::{Severity, ViolationDetail};

    fn policy_violation(rule_text: &str) -> Violation {
        Violation::new(ViolationKind::Policy, Severity::Medium, "contradiction").with_detail(
            ViolationDetail {
                rule_text: Some(rule_text.to_string()),
                ..Default::default()
            },
        )
    }

    fn violations_for(ruleset_yaml: &str, response: &str) -> Vec<Violation> {
        let ruleset = Ruleset::from_yaml(ruleset_yaml).unwrap();
        check_compliance(&ruleset, response).violations
    }

    #[test]
    fn test_never_to_always() {
        let v = policy_violation("Always disclose risk");
        let result = correct("we never guarantee returns", &v);
        assert!(result.changed);
        assert_eq!(result.corrected, "we always guarantee returns");
        assert_eq!(
            result.changes,
            vec!["Aligned language with policy (changed 'never' to 'always' to match policy)"]
        );
    }

    #[test]
    fn test_capital_is_preserved() {
        let v = policy_violation("We always respond within a day");
        let result = correct("We never respond on weekends. We don't, ever.", &v);
        assert_eq!(result.corrected, "We always respond on weekends. We always, ever.");
    }

    #[test]
    fn test_always_to_never() {
        let v = policy_violation("Never promise approval");
        let result = correct("We always approve applications", &v);
        assert_eq!(result.corrected, "We never approve applications");
    }

    #[test]
    fn test_recorrection_is_a_no_op() {
        let violations = violations_for(
            r#"
name: disclosures
policies:
  - id: P-RISK
    name: Risk Disclosure
    category: disclosure
    content: Always disclose risk
"#,
            "we never guarantee returns",
        );
        assert_eq!(violations.len(), 1);
        let v = &violations[0];

        let first = correct("we never guarantee returns", v);
        assert!(first.changed);
        let second = correct(&first.corrected, v);
        assert!(!second.changed);
        assert!(second.changes.is_empty());
        assert_eq!(second.corrected, first.corrected);
    }

    #[test]
    fn test_fresh_violation_sharing_the_rule_word_gets_note() {
        let response = "We always try to help you invest wisely in index funds.";
        let violations = violations_for(
            r#"
name: disclosures
compliance_rules:
  - id: DISC-1
    name: Past performance disclaimer
    rule_type: regulatory
    severity: medium
    required_text: ["past performance"]
    message: Always include a past performance disclaimer
"#,
            response,
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Compliance);

        let result = correct(response, &violations[0]);
        assert!(result.changed);
        assert!(result.corrected.starts_with(response));
        assert!(result.corrected.ends_with(COMPLIANCE_NOTE));
        assert_eq!(result.changes, vec!["Added compliance note"]);
    }

    #[test]
    fn test_time_promise_takes_policy_wording() {
        let response = "Your refund will arrive in 48 hours.";
        let violations = violations_for(
            r#"
name: refunds
policies:
  - id: POL-REFUND
    name: Refund Policy
    category: refund
    content: Refunds are processed within 7-10 business days.
"#,
            response,
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::High);

        let result = correct(response, &violations[0]);
        assert_eq!(result.corrected, "Your refund will arrive in 7-10 business days.");
        assert_eq!(
            result.changes,
            vec!["Adjusted time promise to match policy (7-10 business days)"]
        );

        let again = correct(&result.corrected, &violations[0]);
        assert!(!again.changed);
    }

    #[test]
    fn test_guarantees_are_hedged_with_disclaimer() {
        let response = "This fund offers guaranteed returns and is risk-free.";
        let violations = violations_for(
            r#"
name: sec
compliance_rules:
  - id: SEC-1
    name: No financial guarantees
    rule_type: regulatory
    severity: critical
    keywords: ["guaranteed returns", "risk-free"]
    message: Investment outcomes must never be guaranteed
"#,
            response,
        );
        assert_eq!(violations.len(), 1);

        let result = correct(response, &violations[0]);
        assert_eq!(
            result.corrected,
            format!(
                "This fund offers potential returns and is lower-risk.\n\n{}",
                FINANCIAL_DISCLAIMER
            )
        );
        assert_eq!(
            result.changes,
            vec!["Removed guarantee language", "Added financial disclaimer"]
        );

        let again = correct(&result.corrected, &violations[0]);
        assert!(!again.changed);
        assert!(again.changes.is_empty());
    }

    #[test]
    fn test_financial_rule_without_rewrite_gets_disclaimer_only() {
        let v = Violation::new(ViolationKind::Compliance, Severity::High, "advice").with_detail(
            ViolationDetail {
                rule_id: Some("SEC-2".to_string()),
                rule_name: Some("No specific investment advice".to_string()),
                matched: vec![r"you should\s+buy".to_string()],
                ..Default::default()
            },
        );
        let result = correct("You should buy now.", &v);
        assert!(result.corrected.ends_with(FINANCIAL_DISCLAIMER));
        assert!(!result.corrected.contains(COMPLIANCE_NOTE));
        assert_eq!(result.changes, vec!["Added financial disclaimer"]);
    }

    #[test]
    fn test_note_is_appended_without_polarity() {
        let v = policy_violation("Refunds take 7 days");
        let result = correct("Refunds arrive in 2 days.", &v);
        assert!(result.changed);
        assert!(result.corrected.ends_with(COMPLIANCE_NOTE));
        assert_eq!(result.changes, vec!["Added compliance note"]);

        let again = correct(&result.corrected, &v);
        assert!(!again.changed);
    }

    #[test]
    fn test_note_when_polarity_word_absent() {
        let v = policy_violation("Always disclose risk");
        let result = correct("Returns are strong this year.", &v);
        assert!(result.changed);
        assert!(result.corrected.contains(COMPLIANCE_NOTE));
    }

    #[test]
    fn test_other_kinds_are_untouched() {
        let v = Violation::new(ViolationKind::Hallucination, Severity::High, "false claim");
        let result = correct("The moon is made of cheese", &v);
        assert!(!result.changed);
        assert_eq!(result.corrected, "The moon is made of cheese");
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_compliance_without_detail_gets_note() {
        let v = Violation::new(ViolationKind::Compliance, Severity::High, "missing disclaimer");
        let result = correct("Buy now.", &v);
        assert!(result.changed);
        assert!(result.corrected.starts_with("Buy now."));
    }

    #[test]
    fn test_correct_all_accumulates() {
        let violations = vec![
            policy_violation("Always disclose risk"),
            policy_violation("Fees are listed on the website"),
            Violation::new(ViolationKind::Citation, Severity::High, "bad url"),
        ];
        let result = correct_all("We never hide fees", &violations);
        assert!(result.changed);
        assert!(result.corrected.starts_with("We always hide fees"));
        assert!(result.corrected.ends_with(COMPLIANCE_NOTE));
        assert_eq!(result.changes.len(), 2);
    }

    #[test]
    fn test_custom_tables() {
        let engine = CorrectionEngine::new()
            .with_tables(
                PatternTable::builder()
                    .rewrite("we never", "we always", "custom flip")
                    .build()
                    .unwrap(),
                PatternTable::default(),
            )
            .with_note("See policy.");
        let v = policy_violation("We always refund");

        let result = engine.correct("We never refund", &v);
        assert_eq!(result.corrected, "We always refund");
        assert_eq!(result.changes, vec!["custom flip"]);

        // the table misses but the contradiction is still there
        let result = engine.correct("Refunds never happen", &v);
        assert_eq!(result.corrected, "Refunds never happen\n\nSee policy.");
    }
}
