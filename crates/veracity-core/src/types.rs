//! Core types for Veracity evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scoring::{ComponentKey, ConfidenceBreakdown};
use crate::text;

/// The kind of statement a claim makes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    #[default]
    Factual,
    Numerical,
    Financial,
    Statistical,
    Temporal,
    Regulatory,
}

/// A verifiable assertion extracted from a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claim {
    /// The claim as it appears in the response
    pub text: String,

    /// Lowercased, whitespace-collapsed form used for lookups
    pub normalized: String,

    pub claim_type: ClaimType,

    /// Extraction confidence in [0, 1]
    pub confidence: f64,
}

impl Claim {
    /// Create a factual claim with baseline confidence.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let normalized = text::normalize(&text);
        Self {
            text,
            normalized,
            claim_type: ClaimType::Factual,
            confidence: 0.5,
        }
    }

    pub fn with_type(mut self, claim_type: ClaimType) -> Self {
        self.claim_type = claim_type;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Outcome of checking a single claim against a source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Unverified,
    /// The source contradicts the claim
    False,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::False => "false",
        }
    }
}

/// Result of verifying one claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationResult {
    /// Text of the claim that was checked
    pub claim: String,

    pub status: VerificationStatus,

    /// Confidence of the verifier in [0, 1]
    pub confidence: f64,

    /// Name of the source consulted
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl VerificationResult {
    pub fn new(
        claim: impl Into<String>,
        status: VerificationStatus,
        confidence: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            claim: claim.into(),
            status,
            confidence: confidence.clamp(0.0, 1.0),
            source: source.into(),
            url: None,
        }
    }

    pub fn verified(claim: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(claim, VerificationStatus::Verified, 0.9, source)
    }

    pub fn unverified(claim: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(claim, VerificationStatus::Unverified, 0.3, source)
    }

    pub fn refuted(claim: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(claim, VerificationStatus::False, 0.9, source)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Category of a detected violation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Compliance,
    Policy,
    Citation,
    Hallucination,
    Consistency,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Compliance => "compliance",
            ViolationKind::Policy => "policy",
            ViolationKind::Citation => "citation",
            ViolationKind::Hallucination => "hallucination",
            ViolationKind::Consistency => "consistency",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a violation. Ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a violation came from, when it came from a rule or policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ViolationDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,

    /// Text of the rule or policy the response conflicts with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_text: Option<String>,

    /// Terms or fragments of the response that triggered the violation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,

    /// What the rule expects in place of `matched`, when it names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

/// A detected problem with a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ViolationDetail>,
}

impl Violation {
    pub fn new(kind: ViolationKind, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: ViolationDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Consistency findings are advisory; every other kind is a real violation.
    pub fn is_real(&self) -> bool {
        self.kind != ViolationKind::Consistency
    }

    /// The rule or policy text this violation refers to, if any.
    pub fn rule_text(&self) -> Option<&str> {
        self.detail.as_ref().and_then(|d| d.rule_text.as_deref())
    }
}

/// Final decision for a response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Approved,
    Flagged,
    Blocked,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Approved => "approved",
            Status::Flagged => "flagged",
            Status::Blocked => "blocked",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Status::Approved)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// A collaborator failed or timed out; its component is unscored
    UpstreamUnavailable,

    /// Some claims could not be verified; fact verification covers the rest
    PartialVerification,
}

/// A component that could not be fully evaluated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Degradation {
    pub component: ComponentKey,
    pub kind: DegradationKind,
    pub message: String,
}

impl Degradation {
    pub fn unavailable(component: ComponentKey, message: impl Into<String>) -> Self {
        Self {
            component,
            kind: DegradationKind::UpstreamUnavailable,
            message: message.into(),
        }
    }

    pub fn partial(component: ComponentKey, message: impl Into<String>) -> Self {
        Self {
            component,
            kind: DegradationKind::PartialVerification,
            message: message.into(),
        }
    }
}

/// The complete outcome of evaluating one response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub status: Status,

    /// Equal to `breakdown.total_score`
    pub confidence_score: f64,

    pub violations: Vec<Violation>,

    #[serde(default)]
    pub verification_results: Vec<VerificationResult>,

    pub breakdown: ConfidenceBreakdown,

    pub explanation: String,

    /// Name of the status rule that fired
    pub decided_by: String,

    pub token_count: usize,

    #[serde(default)]
    pub degradations: Vec<Degradation>,

    pub evaluated_at: DateTime<Utc>,
}

impl DetectionResult {
    pub fn has_real_violations(&self) -> bool {
        self.violations.iter().any(Violation::is_real)
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Violations a correction pass can act on.
    pub fn correctable_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| {
            matches!(v.kind, ViolationKind::Policy | ViolationKind::Compliance)
        })
    }
}

/// Outcome of a correction attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrectionResult {
    pub original: String,
    pub corrected: String,

    /// Human-readable description of each edit, in application order
    pub changes: Vec<String>,

    pub changed: bool,
}

impl CorrectionResult {
    /// A result that leaves the text untouched.
    pub fn unchanged(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            original: text.clone(),
            corrected: text,
            changes: Vec::new(),
            changed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(
            [Severity::High, Severity::Low, Severity::Critical]
                .into_iter()
                .max(),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn test_consistency_violation_is_not_real() {
        let advisory = Violation::new(ViolationKind::Consistency, Severity::High, "drift");
        let policy = Violation::new(ViolationKind::Policy, Severity::Low, "conflict");
        assert!(!advisory.is_real());
        assert!(policy.is_real());
    }

    #[test]
    fn test_violation_serialization() {
        let violation = Violation::new(ViolationKind::Policy, Severity::Medium, "conflict")
            .with_detail(ViolationDetail {
                rule_text: Some("Always disclose risk".to_string()),
                ..Default::default()
            });

        let json = serde_json::to_string(&violation).unwrap();
        assert!(json.contains("\"kind\":\"policy\""));
        assert!(json.contains("\"severity\":\"medium\""));
        assert!(!json.contains("rule_id"));

        let back: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, violation);
        assert_eq!(back.rule_text(), Some("Always disclose risk"));
    }

    #[test]
    fn test_false_status_serializes_as_false() {
        let json = serde_json::to_string(&VerificationStatus::False).unwrap();
        assert_eq!(json, "\"false\"");
    }

    #[test]
    fn test_claim_normalization() {
        let claim = Claim::new("  The  Fed raised   rates ");
        assert_eq!(claim.normalized, "the fed raised rates");
        assert_eq!(claim.claim_type, ClaimType::Factual);
    }
}
