//! Deterministic text heuristics used when no external collaborator is
//! configured: claim extraction, citation checks and clarity scoring.

pub mod citations;
pub mod claims;
pub mod clarity;

pub use citations::{check_citations, invalid_citation_violation};
pub use claims::extract_claims;
pub use clarity::clarity_score;
