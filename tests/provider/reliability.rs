use std::sync::Arc;

use gatehouse::{
    provider::{
        LlmProvider, ProviderErrorKind, ReliabilityConfig, ReliabilityLayer, ReliableProvider,
    },
    types::Stance,
};

use crate::support::{FlakyProvider, request};

fn fast_config(max_retries: u32, breaker_failure_threshold: u32) -> ReliabilityConfig {
    ReliabilityConfig {
        request_timeout_ms: 1_000,
        max_retries,
        backoff_base_ms: 1,
        backoff_max_ms: 2,
        breaker_failure_threshold,
        breaker_open_ms: 60_000,
    }
}

#[tokio::test]
async fn given_transient_failures_within_retry_budget_when_generating_then_succeeds() {
    let inner = Arc::new(FlakyProvider::new(
        "flaky",
        vec![ProviderErrorKind::BackendTransient, ProviderErrorKind::Timeout],
    ));
    let provider = ReliableProvider::new(inner.clone(), ReliabilityLayer::new(fast_config(2, 10)));

    let generation = provider
        .generate(&request(Stance::Lens))
        .await
        .expect("third attempt succeeds");

    assert_eq!(generation.provider_id, "flaky");
    assert_eq!(inner.calls(), 3);
}

#[tokio::test]
async fn given_permanent_failure_when_generating_then_not_retried() {
    let inner = Arc::new(FlakyProvider::new(
        "broken",
        vec![ProviderErrorKind::BackendPermanent],
    ));
    let provider = ReliableProvider::new(inner.clone(), ReliabilityLayer::new(fast_config(3, 10)));

    let err = provider
        .generate(&request(Stance::Lens))
        .await
        .expect_err("permanent failure surfaces");

    assert_eq!(err.kind, ProviderErrorKind::BackendPermanent);
    assert_eq!(inner.calls(), 1);
}

#[tokio::test]
async fn given_repeated_transient_failures_when_threshold_reached_then_breaker_short_circuits() {
    let inner = Arc::new(FlakyProvider::new(
        "shaky",
        vec![ProviderErrorKind::BackendTransient; 4],
    ));
    let layer = ReliabilityLayer::new(fast_config(0, 2));
    let provider = ReliableProvider::new(inner.clone(), layer.clone());

    for _ in 0..2 {
        let err = provider
            .generate(&request(Stance::Lens))
            .await
            .expect_err("transient failure surfaces");
        assert_eq!(err.kind, ProviderErrorKind::BackendTransient);
    }
    let err = provider
        .generate(&request(Stance::Lens))
        .await
        .expect_err("breaker is open");

    assert_eq!(err.kind, ProviderErrorKind::CircuitOpen);
    assert_eq!(inner.calls(), 2);
    assert!(layer.ensure_allowed("other").await.is_ok());
}
