use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use gatehouse::{
    capability::Action,
    intent::{IntentKind, IntentResult},
    lens::{
        Confidence, DegradationReason, EvidenceProvider, EvidenceRetriever, LensConfig,
        LensRiskClassifier, RetrievalError, RetrievalErrorKind, RetrievalOutcome, RetrievalSettings,
        SourceDocument,
        TieredVerifier, VerificationMode, VerificationTier,
    },
    types::Domain,
};

const STOCK_QUESTION: &str = "What is the current stock price of ACME?";

struct StaticEvidence {
    id: &'static str,
    url: &'static str,
    snippet: &'static str,
}

#[async_trait]
impl EvidenceProvider for StaticEvidence {
    fn id(&self) -> &str {
        self.id
    }

    async fn fetch(
        &self,
        _query: &str,
        _tier: VerificationTier,
        _timeout: Duration,
    ) -> Result<Vec<SourceDocument>, RetrievalError> {
        Ok(vec![SourceDocument {
            url: self.url.to_string(),
            title: "ACME stock price".to_string(),
            snippet: self.snippet.to_string(),
        }])
    }
}

/// Answers only after `delay`, long past any test timeout.
struct SlowEvidence {
    id: &'static str,
    delay: Duration,
}

#[async_trait]
impl EvidenceProvider for SlowEvidence {
    fn id(&self) -> &str {
        self.id
    }

    async fn fetch(
        &self,
        _query: &str,
        _tier: VerificationTier,
        _timeout: Duration,
    ) -> Result<Vec<SourceDocument>, RetrievalError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![SourceDocument {
            url: format!("https://{}.example.org/acme", self.id),
            title: "ACME stock price".to_string(),
            snippet: "ACME stock price closed at $412.50".to_string(),
        }])
    }
}

struct BrokenEvidence {
    id: &'static str,
}

#[async_trait]
impl EvidenceProvider for BrokenEvidence {
    fn id(&self) -> &str {
        self.id
    }

    async fn fetch(
        &self,
        _query: &str,
        _tier: VerificationTier,
        _timeout: Duration,
    ) -> Result<Vec<SourceDocument>, RetrievalError> {
        Err(RetrievalError::new(RetrievalErrorKind::Unavailable, "search backend is down")
            .with_provider_id(self.id))
    }
}

fn financial_question() -> IntentResult {
    IntentResult {
        kind: IntentKind::Question,
        domain: Domain::Financial,
        requested_actions: vec![Action::Answer],
        confidence: 0.9,
        fallback: false,
    }
}

fn verifier(providers: Vec<Arc<dyn EvidenceProvider>>) -> TieredVerifier {
    verifier_with(LensConfig::default(), providers)
}

fn verifier_with(config: LensConfig, providers: Vec<Arc<dyn EvidenceProvider>>) -> TieredVerifier {
    TieredVerifier::new(
        LensRiskClassifier::pattern_only(),
        EvidenceRetriever::new(providers, RetrievalSettings::from(&config)),
        config,
    )
}

#[tokio::test]
async fn given_agreeing_sources_with_official_one_when_verified_then_confidence_earned_and_figure_licensed() {
    let verifier = verifier(vec![
        Arc::new(StaticEvidence {
            id: "filings",
            url: "https://www.sec.gov/acme/quote",
            snippet: "ACME stock price closed at $412.50",
        }),
        Arc::new(StaticEvidence {
            id: "markets",
            url: "https://markets.example.org/acme",
            snippet: "ACME stock price: 412.50 at close",
        }),
    ]);

    let result = verifier.verify(STOCK_QUESTION, &financial_question()).await;

    assert_eq!(result.tier, VerificationTier::High);
    assert_eq!(result.mode, VerificationMode::MultiProvider);
    assert!(result.force_high);
    assert_eq!(result.retrieval, Some(RetrievalOutcome::Ok));
    assert_eq!(result.confidence, Confidence::Earned);
    assert!(result.is_verified());
    assert!(result.constraints.numeric_precision_allowed);
    assert!(result.constraints.licensed_numbers.contains("412.5"));
    assert!(result.constraints.leak_guard_required);
}

#[tokio::test]
async fn given_sources_disagree_on_the_figure_when_verified_then_degraded_without_numbers() {
    let verifier = verifier(vec![
        Arc::new(StaticEvidence {
            id: "filings",
            url: "https://www.sec.gov/acme/quote",
            snippet: "ACME stock price closed at $412.50",
        }),
        Arc::new(StaticEvidence {
            id: "markets",
            url: "https://markets.example.org/acme",
            snippet: "ACME stock price: 398.10 at close",
        }),
    ]);

    let result = verifier.verify(STOCK_QUESTION, &financial_question()).await;

    assert_eq!(result.confidence, Confidence::Degraded);
    assert_eq!(
        result.degradation_reason,
        Some(DegradationReason::ConflictingSources)
    );
    assert!(!result.constraints.numeric_precision_allowed);
    assert!(result.constraints.licensed_numbers.is_empty());
    assert!(result.constraints.require_qualification);
    assert!(result.constraints.freshness_warning.is_some());
}

#[tokio::test]
async fn given_retrieval_disabled_when_force_high_then_tier_kept_and_insufficient() {
    let verifier = verifier(vec![Arc::new(StaticEvidence {
        id: "filings",
        url: "https://www.sec.gov/acme/quote",
        snippet: "ACME stock price closed at $412.50",
    })])
    .with_retrieval_enabled(false);

    let result = verifier.verify(STOCK_QUESTION, &financial_question()).await;

    assert_eq!(result.tier, VerificationTier::High);
    assert_eq!(result.confidence, Confidence::Insufficient);
    assert_eq!(
        result.degradation_reason,
        Some(DegradationReason::RetrievalFailed)
    );
    assert!(!result.is_verified());
}

#[tokio::test]
async fn given_fail_closed_intent_when_message_is_benign_then_medium_floor_uses_single_provider() {
    let verifier = verifier(vec![Arc::new(StaticEvidence {
        id: "cooking",
        url: "https://recipes.example.org/eggs",
        snippet: "Boil eggs for 9 minutes",
    })]);

    let result = verifier
        .verify("How do I boil an egg?", &IntentResult::conservative())
        .await;

    assert_eq!(result.tier, VerificationTier::Medium);
    assert_eq!(result.mode, VerificationMode::SingleProvider);
    assert_eq!(result.confidence, Confidence::Soft);
    assert!(result.constraints.licensed_numbers.contains("9"));
}

#[tokio::test]
async fn given_everyday_question_when_verified_then_low_tier_skips_retrieval() {
    let verifier = verifier(Vec::new());
    let intent = IntentResult {
        kind: IntentKind::Question,
        domain: Domain::General,
        requested_actions: vec![Action::Answer],
        confidence: 0.9,
        fallback: false,
    };

    let result = verifier.verify("How do I boil an egg?", &intent).await;

    assert_eq!(result.tier, VerificationTier::Low);
    assert_eq!(result.mode, VerificationMode::Skipped);
    assert_eq!(result.confidence, Confidence::ModelOnly);
    assert!(result.evidence.is_none());
}

async fn verify_with_one_straggler(config: LensConfig) -> gatehouse::lens::TieredLensResult {
    let verifier = verifier_with(
        config,
        vec![
            Arc::new(StaticEvidence {
                id: "filings",
                url: "https://www.sec.gov/acme/quote",
                snippet: "ACME stock price closed at $412.50",
            }),
            Arc::new(SlowEvidence {
                id: "markets",
                delay: Duration::from_secs(30),
            }),
        ],
    );
    verifier.verify(STOCK_QUESTION, &financial_question()).await
}

fn assert_partial(result: &gatehouse::lens::TieredLensResult) {
    assert_eq!(result.tier, VerificationTier::High);
    assert_eq!(result.retrieval, Some(RetrievalOutcome::Partial));
    assert_eq!(result.confidence, Confidence::Degraded);
    assert_eq!(
        result.degradation_reason,
        Some(DegradationReason::RetrievalPartial)
    );
    assert!(!result.is_verified());
    assert!(!result.constraints.numeric_precision_allowed);
    assert!(result.constraints.freshness_warning.is_some());

    let evidence = result.evidence.as_ref().expect("partial evidence is kept");
    assert_eq!(evidence.providers_attempted, vec!["filings", "markets"]);
    assert_eq!(evidence.providers_succeeded, vec!["filings"]);
    assert!(evidence.failures.iter().any(|note| note.provider_id == "markets"));
    assert!(!evidence.items.is_empty());
}

#[tokio::test]
async fn given_one_provider_exceeds_its_timeout_when_fanned_out_then_partial_and_degraded() {
    let result = verify_with_one_straggler(LensConfig {
        provider_timeout_ms: 50,
        global_timeout_ms: 2_000,
        ..LensConfig::default()
    })
    .await;

    assert_partial(&result);
}

#[tokio::test]
async fn given_global_deadline_passes_first_when_fanned_out_then_arrived_evidence_is_kept() {
    let started = std::time::Instant::now();
    let result = verify_with_one_straggler(LensConfig {
        provider_timeout_ms: 10_000,
        global_timeout_ms: 50,
        ..LensConfig::default()
    })
    .await;

    assert!(started.elapsed() < Duration::from_secs(5), "global deadline ignored");
    assert_partial(&result);
}

#[tokio::test]
async fn given_primary_search_fails_when_medium_tier_then_fallback_provider_answers() {
    let verifier = verifier(vec![
        Arc::new(BrokenEvidence { id: "primary" }),
        Arc::new(StaticEvidence {
            id: "secondary",
            url: "https://recipes.example.org/eggs",
            snippet: "Boil eggs for 9 minutes",
        }),
    ]);

    let result = verifier
        .verify("How do I boil an egg?", &IntentResult::conservative())
        .await;

    assert_eq!(result.tier, VerificationTier::Medium);
    assert_eq!(result.mode, VerificationMode::SingleProvider);
    assert_eq!(result.retrieval, Some(RetrievalOutcome::Ok));
    assert_eq!(result.confidence, Confidence::Soft);
    let evidence = result.evidence.as_ref().expect("medium tier keeps evidence");
    assert_eq!(evidence.providers_attempted, vec!["primary", "secondary"]);
    assert_eq!(evidence.providers_succeeded, vec!["secondary"]);
    assert_eq!(evidence.failures.len(), 1);
    assert_eq!(evidence.failures[0].provider_id, "primary");
    assert!(result.constraints.licensed_numbers.contains("9"));
}

#[tokio::test]
async fn given_primary_search_succeeds_when_medium_tier_then_fallback_is_not_called() {
    let verifier = verifier(vec![
        Arc::new(StaticEvidence {
            id: "primary",
            url: "https://recipes.example.org/eggs",
            snippet: "Boil eggs for 9 minutes",
        }),
        Arc::new(BrokenEvidence { id: "secondary" }),
    ]);

    let result = verifier
        .verify("How do I boil an egg?", &IntentResult::conservative())
        .await;

    assert_eq!(result.retrieval, Some(RetrievalOutcome::Ok));
    let evidence = result.evidence.as_ref().expect("medium tier keeps evidence");
    assert_eq!(evidence.providers_attempted, vec!["primary"]);
    assert!(evidence.failures.is_empty());
}
