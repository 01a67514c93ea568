//! Runtime orchestrator for concurrent signal collection.
//!
//! The orchestrator gathers every signal the engine scores and hands them
//! to [`Engine::assess_at`]:
//! - Claims are verified concurrently in a `JoinSet`, bounded by a
//!   semaphore, each under its own timeout
//! - Citations, compliance, clarity and history run alongside via
//!   `tokio::join!`, each under the collaborator timeout
//! - A failed or timed-out collaborator leaves its component unscored;
//!   the evaluation itself still succeeds
//!
//! Dropping the evaluation future drops the `JoinSet`, which aborts any
//! verification still in flight.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use veracity_core::engine::validate_response;
use veracity_core::{
    Claim, ConsistencyComparator, DetectionResult, Engine, EvaluationContext, EvaluationError,
    Signal, Signals, Status, VerificationOutcome, VerificationResult,
};

use crate::collaborators::{
    CitationValidator, ClaimExtractor, ClaimVerifier, ClarityScorer, CollaboratorError,
    ComplianceEvaluator, HeuristicClaimExtractor, HeuristicClarityScorer, HistoryStore,
    RulesetEvaluator, SyntacticCitationValidator,
};
use crate::config::{RuntimeConfig, RuntimeConfigError};
use crate::verifier::CachedVerifier;

/// Errors from the runtime orchestrator.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(EvaluationError),

    #[error("Configuration error: {0}")]
    Config(#[from] RuntimeConfigError),

    #[error("Evaluation cancelled")]
    Cancelled,
}

impl From<EvaluationError> for RuntimeError {
    fn from(err: EvaluationError) -> Self {
        match err {
            EvaluationError::MalformedInput(msg) => RuntimeError::MalformedInput(msg),
            other => RuntimeError::Evaluation(other),
        }
    }
}

/// Collects signals from collaborators and scores them.
pub struct Orchestrator {
    config: RuntimeConfig,
    engine: Engine,
    extractor: Arc<dyn ClaimExtractor>,
    verifier: Option<Arc<dyn ClaimVerifier>>,
    citations: Arc<dyn CitationValidator>,
    compliance: Arc<dyn ComplianceEvaluator>,
    clarity: Arc<dyn ClarityScorer>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Evaluate a response.
    ///
    /// Verification results already present in `context` are used as is;
    /// otherwise claims are extracted and sent to the configured verifier.
    /// History comes from `context.history` when non-empty, else from the
    /// history store for `context.context_id`.
    ///
    /// Only approved responses are recorded in the history store. Flagged
    /// and blocked text never becomes a baseline for later consistency
    /// checks.
    pub async fn evaluate(
        &self,
        query: &str,
        response: &str,
        context: &EvaluationContext,
    ) -> Result<DetectionResult, RuntimeError> {
        validate_response(response)?;

        tracing::debug!(
            query_len = query.len(),
            response_len = response.len(),
            ruleset = %context.ruleset.name,
            "Collecting signals"
        );

        let (verification, citations, consistency, compliance, clarity) = tokio::join!(
            self.verification_signal(response, context),
            self.bounded(self.citations.validate(response)),
            self.consistency_signal(query, response, context),
            self.bounded(self.compliance.evaluate(response, &context.ruleset)),
            self.bounded(self.clarity.score(response)),
        );

        let signals = Signals {
            verification,
            citations,
            consistency,
            compliance,
            clarity,
        };

        // Use configured evaluated_at for reproducible results
        let evaluated_at = self.config.determinism.evaluated_at.unwrap_or_else(Utc::now);
        let result = self.engine.assess_at(response, signals, evaluated_at);

        if let (Some(store), Some(context_id), Status::Approved) =
            (&self.history, &context.context_id, result.status)
        {
            if let Err(e) = store.record(query, context_id, response).await {
                tracing::warn!(context_id = %context_id, error = %e, "Failed to record response");
            }
        }

        Ok(result)
    }

    /// Evaluate, giving up as soon as `token` is cancelled.
    ///
    /// Outstanding verifications are aborted on cancellation.
    pub async fn evaluate_with_cancellation(
        &self,
        query: &str,
        response: &str,
        context: &EvaluationContext,
        token: &CancellationToken,
    ) -> Result<DetectionResult, RuntimeError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Evaluation cancelled");
                Err(RuntimeError::Cancelled)
            }
            result = self.evaluate(query, response, context) => result,
        }
    }

    async fn verification_signal(
        &self,
        response: &str,
        context: &EvaluationContext,
    ) -> Signal<VerificationOutcome> {
        if let Some(outcome) = &context.verification {
            return Signal::Ready(outcome.clone());
        }

        let claims = match self.bounded(self.extractor.extract(response)).await {
            Signal::Ready(claims) => claims,
            Signal::Unavailable(reason) => {
                return Signal::unavailable(format!("claim extraction failed: {}", reason))
            }
        };

        if claims.is_empty() {
            return Signal::Ready(VerificationOutcome::default());
        }

        match &self.verifier {
            Some(verifier) => Signal::Ready(self.verify_claims(verifier.clone(), claims).await),
            None => Signal::unavailable(format!(
                "no claim verifier configured for {} claims",
                claims.len()
            )),
        }
    }

    /// Verify claims concurrently. Results keep claim order; failures and
    /// timeouts are counted as unresolved.
    async fn verify_claims(
        &self,
        verifier: Arc<dyn ClaimVerifier>,
        claims: Vec<Claim>,
    ) -> VerificationOutcome {
        let limit = self.config.timeouts.claim_verification;
        let semaphore = Arc::new(Semaphore::new(
            self.config.concurrency.max_concurrent_verifications.max(1),
        ));
        let claim_count = claims.len();

        let mut tasks = JoinSet::new();
        for (index, claim) in claims.into_iter().enumerate() {
            let verifier = verifier.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        let verify = verifier.verify(&claim);
                        match tokio::time::timeout(limit, verify).await {
                            Ok(result) => result,
                            Err(_) => Err(CollaboratorError::Timeout(limit)),
                        }
                    }
                    Err(_) => Err(CollaboratorError::Unavailable(
                        "verification pool closed".to_string(),
                    )),
                };
                (index, claim, result)
            });
        }

        let mut resolved: Vec<(usize, VerificationResult)> = Vec::with_capacity(claim_count);
        let mut unresolved = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(result))) => resolved.push((index, result)),
                Ok((_, claim, Err(e))) => {
                    tracing::warn!(
                        verifier = verifier.name(),
                        claim = %claim.text,
                        error = %e,
                        "Claim verification failed"
                    );
                    unresolved += 1;
                }
                Err(e) => {
                    tracing::warn!(verifier = verifier.name(), error = %e, "Verification task failed");
                    unresolved += 1;
                }
            }
        }

        resolved.sort_by_key(|(index, _)| *index);

        tracing::debug!(
            claims = claim_count,
            resolved = resolved.len(),
            unresolved,
            "Claims verified"
        );

        VerificationOutcome {
            results: resolved.into_iter().map(|(_, result)| result).collect(),
            unresolved,
        }
    }

    async fn consistency_signal(
        &self,
        query: &str,
        response: &str,
        context: &EvaluationContext,
    ) -> Signal<f64> {
        let comparator = ConsistencyComparator::new();

        if !context.history.is_empty() {
            return Signal::Ready(comparator.compare(response, &context.history));
        }

        let history = match (&self.history, &context.context_id) {
            (Some(store), Some(context_id)) => {
                match self.bounded(store.history(query, context_id)).await {
                    Signal::Ready(history) => history,
                    Signal::Unavailable(reason) => return Signal::Unavailable(reason),
                }
            }
            _ => Vec::new(),
        };

        Signal::Ready(comparator.compare(response, &history))
    }

    /// Run a collaborator call under the collaborator timeout.
    async fn bounded<T, F>(&self, call: F) -> Signal<T>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        let limit = self.config.timeouts.collaborator;
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(value)) => Signal::Ready(value),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Collaborator failed");
                Signal::unavailable(e.to_string())
            }
            Err(_) => {
                tracing::warn!(timeout = ?limit, "Collaborator timed out");
                Signal::unavailable(CollaboratorError::Timeout(limit).to_string())
            }
        }
    }
}

/// Builder for [`Orchestrator`].
///
/// Anything not set falls back to the heuristic collaborators from
/// veracity-core. There is no default verifier.
pub struct OrchestratorBuilder {
    config: RuntimeConfig,
    extractor: Option<Arc<dyn ClaimExtractor>>,
    verifier: Option<Arc<dyn ClaimVerifier>>,
    citations: Option<Arc<dyn CitationValidator>>,
    compliance: Option<Arc<dyn ComplianceEvaluator>>,
    clarity: Option<Arc<dyn ClarityScorer>>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            extractor: None,
            verifier: None,
            citations: None,
            compliance: None,
            clarity: None,
            history: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ClaimExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the claim verifier. Wrapped in a [`CachedVerifier`] when the
    /// cache is enabled.
    pub fn verifier(mut self, verifier: Arc<dyn ClaimVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn citation_validator(mut self, validator: Arc<dyn CitationValidator>) -> Self {
        self.citations = Some(validator);
        self
    }

    pub fn compliance_evaluator(mut self, evaluator: Arc<dyn ComplianceEvaluator>) -> Self {
        self.compliance = Some(evaluator);
        self
    }

    pub fn clarity_scorer(mut self, scorer: Arc<dyn ClarityScorer>) -> Self {
        self.clarity = Some(scorer);
        self
    }

    pub fn history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<Orchestrator, RuntimeError> {
        if self.config.concurrency.max_concurrent_verifications == 0 {
            return Err(RuntimeConfigError::Invalid(
                "concurrency.max_concurrent_verifications must be at least 1".to_string(),
            )
            .into());
        }

        let verifier = self.verifier.map(|verifier| {
            if self.config.cache.enabled {
                Arc::new(CachedVerifier::new(verifier, &self.config.cache)) as Arc<dyn ClaimVerifier>
            } else {
                verifier
            }
        });

        Ok(Orchestrator {
            engine: Engine::new(self.config.scoring),
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(HeuristicClaimExtractor) as Arc<dyn ClaimExtractor>),
            verifier,
            citations: self.citations.unwrap_or_else(|| {
                Arc::new(SyntacticCitationValidator) as Arc<dyn CitationValidator>
            }),
            compliance: self
                .compliance
                .unwrap_or_else(|| Arc::new(RulesetEvaluator) as Arc<dyn ComplianceEvaluator>),
            clarity: self
                .clarity
                .unwrap_or_else(|| Arc::new(HeuristicClarityScorer) as Arc<dyn ClarityScorer>),
            history: self.history,
            config: self.config,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistory;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use veracity_core::{
        CitationReport, ComponentKey, DegradationKind, Ruleset, Status, VerificationStatus,
        ViolationKind,
    };

    const RESPONSE: &str = "The Federal Reserve raised rates in March 2024. \
        Deposits are insured up to $250,000 per depositor. \
        The fund returned 12% last year.";

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    fn config() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.timeouts.claim_verification = Duration::from_secs(1);
        config.timeouts.collaborator = Duration::from_secs(2);
        config.cache.enabled = false;
        config.determinism.evaluated_at = Some(fixed_time());
        config
    }

    // Verifier whose behavior depends on the claim text
    struct ScriptedVerifier {
        calls: AtomicUsize,
    }

    impl ScriptedVerifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ClaimVerifier for ScriptedVerifier {
        async fn verify(&self, claim: &Claim) -> Result<VerificationResult, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if claim.normalized.contains("fund") {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if claim.normalized.contains("federal reserve") {
                return Ok(VerificationResult::verified(&claim.text, "scripted"));
            }
            Ok(VerificationResult::unverified(&claim.text, "scripted"))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingVerifier;

    #[async_trait]
    impl ClaimVerifier for FailingVerifier {
        async fn verify(&self, _claim: &Claim) -> Result<VerificationResult, CollaboratorError> {
            Err(CollaboratorError::Unavailable("fact service down".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct DownValidator;

    #[async_trait]
    impl CitationValidator for DownValidator {
        async fn validate(&self, _response: &str) -> Result<CitationReport, CollaboratorError> {
            Err(CollaboratorError::Unavailable("503".to_string()))
        }
    }

    struct SlowClarity;

    #[async_trait]
    impl ClarityScorer for SlowClarity {
        async fn score(&self, _response: &str) -> Result<f64, CollaboratorError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(1.0)
        }
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    // Never finishes; counts how many lookups were started and torn down
    struct HangingVerifier {
        started: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ClaimVerifier for HangingVerifier {
        async fn verify(&self, _claim: &Claim) -> Result<VerificationResult, CollaboratorError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _guard = DropCounter(self.dropped.clone());
            std::future::pending::<()>().await;
            unreachable!()
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn orchestrator_with(verifier: Arc<dyn ClaimVerifier>) -> Orchestrator {
        Orchestrator::builder()
            .config(config())
            .verifier(verifier)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_claim_yields_partial_verification() {
        let verifier = ScriptedVerifier::new();
        let orchestrator = orchestrator_with(verifier.clone());

        let result = orchestrator
            .evaluate("rates?", RESPONSE, &EvaluationContext::new())
            .await
            .unwrap();

        assert_eq!(verifier.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.verification_results.len(), 2);
        assert_eq!(result.verification_results[0].status, VerificationStatus::Verified);

        let fact = result
            .breakdown
            .component(ComponentKey::FactVerification)
            .unwrap();
        assert_eq!(fact.score, Some(0.5));
        assert_eq!(fact.count("unresolved"), 1);
        assert_eq!(result.degradations.len(), 1);
        assert_eq!(result.degradations[0].kind, DegradationKind::PartialVerification);
        assert_eq!(result.evaluated_at, fixed_time());
    }

    #[tokio::test]
    async fn test_all_verifications_failing_leaves_fact_unscored() {
        let orchestrator = orchestrator_with(Arc::new(FailingVerifier));
        let result = orchestrator
            .evaluate("rates?", RESPONSE, &EvaluationContext::new())
            .await
            .unwrap();

        let fact = result
            .breakdown
            .component(ComponentKey::FactVerification)
            .unwrap();
        assert!(!fact.is_scored());
        assert_eq!(fact.effective_weight, 0.0);

        let effective: f64 = result
            .breakdown
            .components
            .values()
            .map(|c| c.effective_weight)
            .sum();
        assert!((effective - 1.0).abs() < 1e-9);
        assert_eq!(result.degradations[0].kind, DegradationKind::UpstreamUnavailable);
        assert!(result.verification_results.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_validator_redistributes_weight() {
        let orchestrator = Orchestrator::builder()
            .config(config())
            .verifier(ScriptedVerifier::new())
            .citation_validator(Arc::new(DownValidator))
            .build()
            .unwrap();

        let result = orchestrator
            .evaluate(
                "rates?",
                "The Federal Reserve raised rates in March 2024.",
                &EvaluationContext::new(),
            )
            .await
            .unwrap();

        let citation = result
            .breakdown
            .component(ComponentKey::CitationValidity)
            .unwrap();
        assert!(citation.unscored_reason.as_deref().unwrap().contains("503"));
        assert_eq!(result.degradations.len(), 1);
        assert_eq!(result.degradations[0].component, ComponentKey::CitationValidity);
        assert!((result.breakdown.recomputed_total() - result.confidence_score).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_collaborator_times_out() {
        let orchestrator = Orchestrator::builder()
            .config(config())
            .clarity_scorer(Arc::new(SlowClarity))
            .build()
            .unwrap();

        let result = orchestrator
            .evaluate("hello", "Thanks for reaching out to us today.", &EvaluationContext::new())
            .await
            .unwrap();

        let clarity = result
            .breakdown
            .component(ComponentKey::ResponseClarity)
            .unwrap();
        assert!(!clarity.is_scored());
        assert!(clarity.unscored_reason.as_deref().unwrap().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_without_verifier_claims_are_unscored() {
        let orchestrator = Orchestrator::builder().config(config()).build().unwrap();
        let result = orchestrator
            .evaluate("rates?", RESPONSE, &EvaluationContext::new())
            .await
            .unwrap();
        let fact = result
            .breakdown
            .component(ComponentKey::FactVerification)
            .unwrap();
        assert!(fact
            .unscored_reason
            .as_deref()
            .unwrap()
            .contains("no claim verifier configured for 3 claims"));
    }

    #[tokio::test]
    async fn test_supplied_verification_skips_verifier() {
        let verifier = ScriptedVerifier::new();
        let orchestrator = orchestrator_with(verifier.clone());
        let context = EvaluationContext::new().with_verification(VerificationOutcome::complete(
            vec![VerificationResult::refuted("The fund returned 12% last year", "audit")],
        ));

        let result = orchestrator.evaluate("q", RESPONSE, &context).await.unwrap();

        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.status, Status::Blocked);
        assert_eq!(result.violations[0].kind, ViolationKind::Hallucination);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_outstanding_lookups() {
        let started = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicUsize::new(0));
        let orchestrator = orchestrator_with(Arc::new(HangingVerifier {
            started: started.clone(),
            dropped: dropped.clone(),
        }));

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let err = orchestrator
            .evaluate_with_cancellation("rates?", RESPONSE, &EvaluationContext::new(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Cancelled));

        // let the runtime tear down the aborted tasks
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(dropped.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cache_serves_repeated_claims() {
        let mut cached = config();
        cached.cache.enabled = true;
        let verifier = ScriptedVerifier::new();
        let orchestrator = Orchestrator::builder()
            .config(cached)
            .verifier(verifier.clone())
            .build()
            .unwrap();

        let response = "The Federal Reserve raised rates in March 2024.";
        for _ in 0..3 {
            orchestrator
                .evaluate("rates?", response, &EvaluationContext::new())
                .await
                .unwrap();
        }
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_history_store_feeds_consistency_and_records() {
        let store = Arc::new(InMemoryHistory::default());
        store.seed("cust-42", ["Your refund will arrive within five business days."]).await;
        let orchestrator = Orchestrator::builder()
            .config(config())
            .history_store(store.clone())
            .build()
            .unwrap();

        let context = EvaluationContext::new().with_context_id("cust-42");
        let result = orchestrator
            .evaluate("refund?", "Refunds are processed within five business days.", &context)
            .await
            .unwrap();

        // a single prior response is scored leniently
        assert_eq!(
            result.breakdown.score_of(ComponentKey::ConsistencyCheck),
            Some(ConsistencyComparator::SINGLE_PRIOR)
        );
        assert_eq!(result.status, Status::Approved);
        assert_eq!(store.history("refund?", "cust-42").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_response_is_not_recorded() {
        let ruleset = Ruleset::from_yaml(
            r#"
name: sec
compliance_rules:
  - id: SEC-1
    name: No financial guarantees
    rule_type: regulatory
    severity: critical
    keywords: ["guaranteed returns"]
"#,
        )
        .unwrap();
        let store = Arc::new(InMemoryHistory::default());
        let orchestrator = Orchestrator::builder()
            .config(config())
            .history_store(store.clone())
            .build()
            .unwrap();

        let context = EvaluationContext::new()
            .with_context_id("cust-7")
            .with_ruleset(ruleset);
        let result = orchestrator
            .evaluate("invest?", "Our plan has guaranteed returns for everyone.", &context)
            .await
            .unwrap();

        assert_eq!(result.status, Status::Blocked);
        assert!(store.history("invest?", "cust-7").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compliance_uses_context_ruleset() {
        let ruleset = Ruleset::from_yaml(
            r#"
name: sec
compliance_rules:
  - id: SEC-1
    name: No financial guarantees
    rule_type: regulatory
    severity: critical
    keywords: ["guaranteed returns"]
"#,
        )
        .unwrap();
        let orchestrator = Orchestrator::builder().config(config()).build().unwrap();
        let context = EvaluationContext::new().with_ruleset(ruleset);

        let result = orchestrator
            .evaluate("invest?", "Our plan has guaranteed returns for everyone.", &context)
            .await
            .unwrap();
        assert_eq!(result.status, Status::Blocked);
        assert_eq!(result.decided_by, "critical_violation");
    }

    #[tokio::test]
    async fn test_blank_response_is_malformed() {
        let orchestrator = Orchestrator::builder().config(config()).build().unwrap();
        let err = orchestrator
            .evaluate("q", " \t\n", &EvaluationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn test_same_inputs_same_result() {
        let orchestrator = orchestrator_with(Arc::new(FailingVerifier));
        let a = orchestrator
            .evaluate("q", RESPONSE, &EvaluationContext::new())
            .await
            .unwrap();
        let b = orchestrator
            .evaluate("q", RESPONSE, &EvaluationContext::new())
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let mut bad = config();
        bad.concurrency.max_concurrent_verifications = 0;
        let result = Orchestrator::builder().config(bad).build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }
}
