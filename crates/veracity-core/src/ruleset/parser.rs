//! Ruleset parsing from YAML/JSON.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::{Severity, ViolationKind};

/// Errors that can occur when loading rulesets.
#[derive(Error, Debug)]
pub enum RulesetError {
    #[error("Failed to read ruleset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ruleset validation failed: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Where a compliance rule comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// External regulation (EU AI Act, SEC, CFPB, GDPR, ...)
    Regulatory,
    /// Organization policy expressed as a rule
    Policy,
    #[default]
    Custom,
}

/// How `keywords` / `patterns` are matched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Case-insensitive substring match on each keyword
    #[default]
    Keyword,
    /// Case-insensitive regex match on each pattern
    Pattern,
}

/// What the rule asks for when violated. Informational; the status is
/// decided from severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    #[default]
    Flag,
    Warn,
    Rewrite,
}

/// A single compliance rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceRule {
    /// Unique identifier (e.g., "SEC-1")
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub rule_type: RuleType,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub match_type: MatchType,

    /// Prohibited keywords (match_type = keyword)
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Prohibited regex patterns (match_type = pattern)
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Every entry must appear in the response
    #[serde(default)]
    pub required_text: Vec<String>,

    /// No entry may appear in the response
    #[serde(default)]
    pub forbidden_text: Vec<String>,

    #[serde(default)]
    pub action: RuleAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

impl ComplianceRule {
    /// Violations of policy-type rules are policy violations.
    pub fn violation_kind(&self) -> ViolationKind {
        match self.rule_type {
            RuleType::Policy => ViolationKind::Policy,
            RuleType::Regulatory | RuleType::Custom => ViolationKind::Compliance,
        }
    }

    /// The text reported as this rule's wording.
    pub fn rule_text(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.name)
    }

    fn has_checks(&self) -> bool {
        !(self.keywords.is_empty()
            && self.patterns.is_empty()
            && self.required_text.is_empty()
            && self.forbidden_text.is_empty())
    }
}

/// An organization policy stated in prose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub id: String,
    pub name: String,

    /// Free-form category (e.g., "refund", "credit")
    #[serde(default)]
    pub category: String,

    pub content: String,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn default_version() -> String {
    "1".to_string()
}

/// A named set of compliance rules and policies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ruleset {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub compliance_rules: Vec<ComplianceRule>,

    #[serde(default)]
    pub policies: Vec<Policy>,
}

impl Ruleset {
    /// A ruleset with no rules or policies.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: None,
            compliance_rules: Vec::new(),
            policies: Vec::new(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RulesetError> {
        let ruleset: Ruleset = serde_yaml::from_str(yaml)?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    pub fn from_json(json: &str) -> Result<Self, RulesetError> {
        let ruleset: Ruleset = serde_json::from_str(json)?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RulesetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RulesetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load by extension: `.json` is JSON, anything else is YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RulesetError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    /// Validate the ruleset structure.
    fn validate(&self) -> Result<(), RulesetError> {
        if self.name.trim().is_empty() {
            return Err(RulesetError::MissingField("name".to_string()));
        }

        for (i, rule) in self.compliance_rules.iter().enumerate() {
            if rule.id.trim().is_empty() {
                return Err(RulesetError::MissingField(format!(
                    "compliance_rules[{}].id",
                    i
                )));
            }
            if rule.name.trim().is_empty() {
                return Err(RulesetError::MissingField(format!(
                    "compliance_rules[{}].name",
                    i
                )));
            }
            if !rule.has_checks() {
                return Err(RulesetError::Validation(format!(
                    "Rule {} has no keywords, patterns, required or forbidden text",
                    rule.id
                )));
            }
        }

        for (i, policy) in self.policies.iter().enumerate() {
            if policy.id.trim().is_empty() {
                return Err(RulesetError::MissingField(format!("policies[{}].id", i)));
            }
            if policy.content.trim().is_empty() {
                return Err(RulesetError::MissingField(format!(
                    "policies[{}].content",
                    i
                )));
            }
        }

        self.validate_unique_ids()?;

        Ok(())
    }

    /// Rule and policy ids share one namespace.
    fn validate_unique_ids(&self) -> Result<(), RulesetError> {
        let mut seen = HashSet::new();

        let ids = self
            .compliance_rules
            .iter()
            .map(|r| &r.id)
            .chain(self.policies.iter().map(|p| &p.id));

        for id in ids {
            if !seen.insert(id) {
                return Err(RulesetError::Validation(format!("Duplicate rule ID: {}", id)));
            }
        }

        Ok(())
    }

    /// Non-fatal problems: patterns that do not compile are skipped at
    /// evaluation time.
    pub fn warnings(&self) -> Vec<String> {
        self.compliance_rules
            .iter()
            .flat_map(|rule| {
                rule.patterns.iter().filter_map(move |pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .err()
                        .map(|e| format!("Rule {}: invalid pattern '{}': {}", rule.id, pattern, e))
                })
            })
            .collect()
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &ComplianceRule> {
        self.compliance_rules.iter().filter(|r| r.active)
    }

    pub fn active_policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.iter().filter(|p| p.active)
    }

    pub fn rule(&self, id: &str) -> Option<&ComplianceRule> {
        self.compliance_rules.iter().find(|r| r.id == id)
    }

    pub fn policy(&self, id: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
name: finance-support
version: "2"
compliance_rules:
  - id: SEC-1
    name: No financial guarantees
    rule_type: regulatory
    severity: critical
    keywords: ["guaranteed returns", "risk-free"]
    action: block
    message: Investment returns must never be guaranteed
  - id: POL-1
    name: Mention the support line
    rule_type: policy
    severity: low
    required_text: ["support line"]
    active: false
policies:
  - id: P-REFUND
    name: Refund Policy
    category: refund
    content: Refunds are processed within 7 business days.
"#;

    #[test]
    fn test_parse_valid_ruleset() {
        let ruleset = Ruleset::from_yaml(SAMPLE).unwrap();
        assert_eq!(ruleset.name, "finance-support");
        assert_eq!(ruleset.version, "2");
        assert_eq!(ruleset.compliance_rules.len(), 2);
        assert_eq!(ruleset.active_rules().count(), 1);

        let sec = ruleset.rule("SEC-1").unwrap();
        assert_eq!(sec.severity, Severity::Critical);
        assert_eq!(sec.match_type, MatchType::Keyword);
        assert_eq!(sec.violation_kind(), ViolationKind::Compliance);
        assert_eq!(sec.rule_text(), "Investment returns must never be guaranteed");

        let pol = ruleset.rule("POL-1").unwrap();
        assert_eq!(pol.violation_kind(), ViolationKind::Policy);
        assert_eq!(pol.rule_text(), "Mention the support line");

        assert_eq!(ruleset.policy("P-REFUND").unwrap().category, "refund");
    }

    #[test]
    fn test_defaults() {
        let ruleset = Ruleset::from_yaml(
            r#"
name: minimal
compliance_rules:
  - id: R1
    name: No slang
    keywords: ["gonna"]
"#,
        )
        .unwrap();
        let rule = &ruleset.compliance_rules[0];
        assert_eq!(ruleset.version, "1");
        assert_eq!(rule.rule_type, RuleType::Custom);
        assert_eq!(rule.severity, Severity::Medium);
        assert_eq!(rule.action, RuleAction::Flag);
        assert!(rule.active);
    }

    #[test]
    fn test_missing_name() {
        let err = Ruleset::from_yaml("name: ''\n").unwrap_err();
        assert!(matches!(err, RulesetError::MissingField(ref f) if f == "name"));
    }

    #[test]
    fn test_duplicate_ids() {
        let yaml = r#"
name: dupes
compliance_rules:
  - id: X1
    name: First
    keywords: ["a"]
policies:
  - id: X1
    name: Second
    content: Always be polite
"#;
        let err = Ruleset::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate rule ID: X1"));
    }

    #[test]
    fn test_rule_without_checks() {
        let yaml = r#"
name: empty-rule
compliance_rules:
  - id: E1
    name: Nothing to check
"#;
        let err = Ruleset::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, RulesetError::Validation(_)));
    }

    #[test]
    fn test_invalid_pattern_is_a_warning() {
        let yaml = r#"
name: patterns
compliance_rules:
  - id: P1
    name: Broken
    match_type: pattern
    patterns: ["(unclosed", "buy\\s+\\w+\\s+stock"]
"#;
        let ruleset = Ruleset::from_yaml(yaml).unwrap();
        let warnings = ruleset.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("(unclosed"));
    }

    #[test]
    fn test_json_round_trip() {
        let ruleset = Ruleset::from_yaml(SAMPLE).unwrap();
        let json = serde_json::to_string(&ruleset).unwrap();
        let back = Ruleset::from_json(&json).unwrap();
        assert_eq!(back, ruleset);
    }

    #[test]
    fn test_from_file_by_extension() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        yaml.write_all(SAMPLE.as_bytes()).unwrap();
        assert_eq!(Ruleset::from_file(yaml.path()).unwrap().name, "finance-support");

        let json_text = serde_json::to_string(&Ruleset::from_yaml(SAMPLE).unwrap()).unwrap();
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json.write_all(json_text.as_bytes()).unwrap();
        assert_eq!(Ruleset::from_file(json.path()).unwrap().policies.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = Ruleset::from_yaml_file("/nonexistent/ruleset.yaml").unwrap_err();
        assert!(matches!(err, RulesetError::Io(_)));
    }
}
