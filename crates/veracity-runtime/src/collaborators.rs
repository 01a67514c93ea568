//! Collaborator traits consumed by the orchestrator.
//!
//! Every signal the engine scores comes from one of these. A collaborator
//! that errors or times out never fails the evaluation: the orchestrator
//! turns the failure into an unscored component.
//!
//! The heuristic implementations here wrap the deterministic checks in
//! veracity-core and are what the orchestrator uses when nothing else is
//! registered.

use async_trait::async_trait;
use thiserror::Error;

use veracity_core::heuristics::{check_citations, clarity_score, extract_claims};
use veracity_core::ruleset::check_compliance;
use veracity_core::{CitationReport, Claim, ComplianceOutcome, Ruleset, VerificationResult};

/// Errors from collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Collaborator failed: {0}")]
    Failed(String),
}

/// Finds verifiable claims in a response.
#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    async fn extract(&self, response: &str) -> Result<Vec<Claim>, CollaboratorError>;
}

/// Checks one claim against a source of truth.
#[async_trait]
pub trait ClaimVerifier: Send + Sync {
    async fn verify(&self, claim: &Claim) -> Result<VerificationResult, CollaboratorError>;

    /// Name reported as the verification source.
    fn name(&self) -> &str;
}

/// Finds and validates the citations in a response.
#[async_trait]
pub trait CitationValidator: Send + Sync {
    async fn validate(&self, response: &str) -> Result<CitationReport, CollaboratorError>;
}

/// Evaluates a response against compliance rules and policies.
#[async_trait]
pub trait ComplianceEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        response: &str,
        ruleset: &Ruleset,
    ) -> Result<ComplianceOutcome, CollaboratorError>;
}

/// Scores how clear a response reads, in [0, 1].
#[async_trait]
pub trait ClarityScorer: Send + Sync {
    async fn score(&self, response: &str) -> Result<f64, CollaboratorError>;
}

/// Prior responses, per conversation or tenant.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Earlier responses for `context_id`, oldest first.
    async fn history(&self, query: &str, context_id: &str)
        -> Result<Vec<String>, CollaboratorError>;

    /// Remember a response for later consistency checks.
    async fn record(
        &self,
        query: &str,
        context_id: &str,
        response: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Sentence-level claim extraction from veracity-core.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClaimExtractor;

#[async_trait]
impl ClaimExtractor for HeuristicClaimExtractor {
    async fn extract(&self, response: &str) -> Result<Vec<Claim>, CollaboratorError> {
        Ok(extract_claims(response))
    }
}

/// Offline citation check: URLs must be well formed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntacticCitationValidator;

#[async_trait]
impl CitationValidator for SyntacticCitationValidator {
    async fn validate(&self, response: &str) -> Result<CitationReport, CollaboratorError> {
        Ok(check_citations(response))
    }
}

/// Keyword, pattern and policy checks from veracity-core.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesetEvaluator;

#[async_trait]
impl ComplianceEvaluator for RulesetEvaluator {
    async fn evaluate(
        &self,
        response: &str,
        ruleset: &Ruleset,
    ) -> Result<ComplianceOutcome, CollaboratorError> {
        Ok(check_compliance(ruleset, response))
    }
}

/// Sentence-length and hedging heuristic from veracity-core.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClarityScorer;

#[async_trait]
impl ClarityScorer for HeuristicClarityScorer {
    async fn score(&self, response: &str) -> Result<f64, CollaboratorError> {
        Ok(clarity_score(response))
    }
}
