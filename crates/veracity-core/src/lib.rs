//! # veracity-core
//!
//! Deterministic scoring and decision engine for AI-generated responses.
//!
//! This crate answers, for a single response:
//! - How much should we trust it? (weighted confidence with a full breakdown)
//! - Should it go out? (approved / flagged / blocked)
//! - Can it be fixed? (best-effort correction)
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input and timestamp always produce the same output
//! 2. **Explainable**: The breakdown carries everything needed to recompute the total
//! 3. **Violations outrank scores**: No score can approve a critical violation
//! 4. **Degrades, never guesses**: Missing signals are reported, not invented
//!
//! ## Example
//!
//! ```rust,ignore
//! use veracity_core::{evaluate, EvaluationContext, Ruleset, Status};
//!
//! let ruleset = Ruleset::from_yaml_file("rulesets/finance.yaml")?;
//! let context = EvaluationContext::new().with_ruleset(ruleset);
//! let result = evaluate("Is my deposit insured?", "Yes, up to $250,000.", &context)?;
//!
//! match result.status {
//!     Status::Approved => println!("OK ({:.0}%)", result.confidence_score * 100.0),
//!     Status::Flagged => println!("REVIEW: {}", result.explanation),
//!     Status::Blocked => println!("BLOCKED by {}", result.decided_by),
//! }
//! ```

pub mod consistency;
pub mod correction;
pub mod decision;
pub mod engine;
pub mod explanation;
pub mod heuristics;
pub mod ruleset;
pub mod scoring;
pub mod text;
pub mod types;

// Re-export main types at crate root
pub use consistency::ConsistencyComparator;
pub use correction::{correct, correct_all, CorrectionEngine, PatternTable};
pub use decision::{Decision, DecisionInput, DecisionThresholds, RuleCondition, StatusPolicy, StatusRule};
pub use engine::Engine;
pub use ruleset::{ComplianceRule, Policy, Ruleset, RulesetError};
pub use scoring::{
    CitationReport, ComplianceOutcome, ComponentKey, ComponentScore, ConfidenceAggregator,
    ConfidenceBreakdown, ComponentScorer, ConfigError, Contributions, ScoringConfig, Signal,
    Signals, VerificationOutcome, WeightConfig,
};
pub use types::{
    Claim, ClaimType, CorrectionResult, Degradation, DegradationKind, DetectionResult, Severity,
    Status, VerificationResult, VerificationStatus, Violation, ViolationDetail, ViolationKind,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during evaluation
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Ruleset error: {0}")]
    Ruleset(#[from] RulesetError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Everything an evaluation needs besides the query and response.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Conversation or tenant the response belongs to
    pub context_id: Option<String>,

    pub ruleset: Ruleset,

    /// Earlier responses in the same context, oldest first
    pub history: Vec<String>,

    /// Claim verification already performed by the caller
    pub verification: Option<VerificationOutcome>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            context_id: None,
            ruleset: Ruleset::empty("default"),
            history: Vec::new(),
            verification: None,
        }
    }
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_ruleset(mut self, ruleset: Ruleset) -> Self {
        self.ruleset = ruleset;
        self
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }

    pub fn with_verification(mut self, verification: VerificationOutcome) -> Self {
        self.verification = Some(verification);
        self
    }
}

/// Evaluate a response with the default engine and built-in heuristics.
///
/// # Determinism
///
/// This function uses the current system time for `evaluated_at`.
/// For reproducible results, use [`evaluate_at`].
pub fn evaluate(
    query: &str,
    response: &str,
    context: &EvaluationContext,
) -> Result<DetectionResult, EvaluationError> {
    evaluate_at(query, response, context, Utc::now())
}

/// Evaluate a response with an explicit timestamp.
///
/// Same inputs always produce the same output.
pub fn evaluate_at(
    query: &str,
    response: &str,
    context: &EvaluationContext,
    evaluated_at: DateTime<Utc>,
) -> Result<DetectionResult, EvaluationError> {
    Engine::default().evaluate_at(query, response, context, evaluated_at)
}
