//! # veracity-runtime
//!
//! Async signal collection for veracity-core.
//!
//! The core engine scores signals it is handed. This crate gathers them:
//! claims are verified concurrently against a [`ClaimVerifier`], and the
//! citation, compliance, clarity and history collaborators run alongside.
//! Any collaborator may fail or time out; the affected component is then
//! left unscored and recorded as a degradation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use veracity_core::EvaluationContext;
//! use veracity_runtime::{KnowledgeBaseVerifier, Orchestrator, RuntimeConfig};
//!
//! let verifier = KnowledgeBaseVerifier::from_json_file("facts.json")?;
//! let orchestrator = Orchestrator::builder()
//!     .config(RuntimeConfig::from_yaml_file("veracity.yaml")?)
//!     .verifier(Arc::new(verifier))
//!     .build()?;
//!
//! let result = orchestrator
//!     .evaluate("Is my deposit insured?", response, &EvaluationContext::new())
//!     .await?;
//! ```

pub mod citations;
pub mod collaborators;
pub mod config;
pub mod history;
pub mod orchestrator;
pub mod verifier;

pub use citations::HttpCitationValidator;
pub use collaborators::{
    CitationValidator, ClaimExtractor, ClaimVerifier, ClarityScorer, CollaboratorError,
    ComplianceEvaluator, HeuristicClaimExtractor, HeuristicClarityScorer, HistoryStore,
    RulesetEvaluator, SyntacticCitationValidator,
};
pub use config::{
    CacheConfig, ConcurrencyConfig, DeterminismConfig, RuntimeConfig, RuntimeConfigError,
    TimeoutConfig,
};
pub use history::InMemoryHistory;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, RuntimeError};
pub use verifier::{CachedVerifier, Fact, FactTable, KnowledgeBaseVerifier};

pub use tokio_util::sync::CancellationToken;
