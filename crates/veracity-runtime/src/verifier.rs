//! Claim verifiers.
//!
//! [`KnowledgeBaseVerifier`] checks claims against a static fact table.
//! [`CachedVerifier`] puts a TTL cache in front of any verifier.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};

use veracity_core::text;
use veracity_core::{Claim, VerificationResult, VerificationStatus};

use crate::collaborators::{ClaimVerifier, CollaboratorError};
use crate::config::{CacheConfig, RuntimeConfigError};

/// Term overlap at or above which a fact is taken to address a claim.
pub const FACT_MATCH_THRESHOLD: f64 = 0.6;

/// One entry in a fact table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fact {
    pub statement: String,

    /// `verified` when the statement is true, `false` when it is a known falsehood
    pub status: VerificationStatus,

    #[serde(default = "default_fact_confidence")]
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_fact_confidence() -> f64 {
    0.9
}

/// A fact table as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FactTable {
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default)]
    pub facts: Vec<Fact>,
}

fn default_source() -> String {
    "knowledge_base".to_string()
}

/// Verifies claims against a static fact table.
///
/// A claim matches a fact when either contains the other after
/// normalization, or when their term overlap reaches
/// [`FACT_MATCH_THRESHOLD`]. The best match wins; claims with no match are
/// unverified.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseVerifier {
    source: String,
    facts: Vec<IndexedFact>,
}

#[derive(Debug, Clone)]
struct IndexedFact {
    fact: Fact,
    normalized: String,
    terms: std::collections::BTreeSet<String>,
}

impl KnowledgeBaseVerifier {
    pub fn new(table: FactTable) -> Self {
        let facts = table
            .facts
            .into_iter()
            .map(|fact| IndexedFact {
                normalized: text::normalize(&fact.statement),
                terms: text::terms(&fact.statement),
                fact,
            })
            .collect();
        Self {
            source: table.source,
            facts,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RuntimeConfigError> {
        let table: FactTable = serde_json::from_str(json)
            .map_err(|e| RuntimeConfigError::Invalid(format!("fact table: {}", e)))?;
        Ok(Self::new(table))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RuntimeConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    fn best_match(&self, claim: &Claim) -> Option<&Fact> {
        if claim.normalized.is_empty() {
            return None;
        }
        let claim_terms = text::terms(&claim.text);
        let mut best: Option<(f64, &Fact)> = None;

        for indexed in &self.facts {
            let score = if claim.normalized.contains(&indexed.normalized)
                || indexed.normalized.contains(&claim.normalized)
            {
                1.0
            } else {
                text::jaccard(&claim_terms, &indexed.terms).unwrap_or(0.0)
            };

            if score >= FACT_MATCH_THRESHOLD && best.map_or(true, |(s, _)| score > s) {
                best = Some((score, &indexed.fact));
            }
        }

        best.map(|(_, fact)| fact)
    }
}

#[async_trait]
impl ClaimVerifier for KnowledgeBaseVerifier {
    async fn verify(&self, claim: &Claim) -> Result<VerificationResult, CollaboratorError> {
        let result = match self.best_match(claim) {
            Some(fact) => {
                let result =
                    VerificationResult::new(&claim.text, fact.status, fact.confidence, &self.source);
                match &fact.url {
                    Some(url) => result.with_url(url),
                    None => result,
                }
            }
            None => VerificationResult::unverified(&claim.text, &self.source),
        };
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.source
    }
}

/// TTL cache in front of another verifier, keyed by normalized claim text.
///
/// Only successful lookups are cached; a failure is retried on the next
/// evaluation.
#[derive(Clone)]
pub struct CachedVerifier {
    inner: Arc<dyn ClaimVerifier>,
    cache: Cache<String, VerificationResult>,
}

impl CachedVerifier {
    pub fn new(inner: Arc<dyn ClaimVerifier>, config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { inner, cache }
    }

    /// Number of cached verdicts.
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClaimVerifier for CachedVerifier {
    async fn verify(&self, claim: &Claim) -> Result<VerificationResult, CollaboratorError> {
        if let Some(mut hit) = self.cache.get(claim.normalized.as_str()).await {
            tracing::debug!(source = self.inner.name(), "Verification cache hit");
            // report the claim as this response phrased it
            hit.claim = claim.text.clone();
            return Ok(hit);
        }

        let result = self.inner.verify(claim).await?;
        self.cache
            .insert(claim.normalized.clone(), result.clone())
            .await;
        Ok(result)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
