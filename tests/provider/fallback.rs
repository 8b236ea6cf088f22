use std::sync::Arc;

use gatehouse::{
    provider::{FallbackGenerator, LlmProvider, MOCK_PROVIDER_ID, ProviderErrorKind},
    types::Stance,
};

use crate::support::{FlakyProvider, request};

#[tokio::test]
async fn given_first_provider_fails_when_generating_then_next_provider_answers() {
    let first = Arc::new(FlakyProvider::new(
        "first",
        vec![ProviderErrorKind::BackendPermanent],
    ));
    let second = Arc::new(FlakyProvider::new("second", Vec::new()));
    let providers: Vec<Arc<dyn LlmProvider>> = vec![first.clone(), second.clone()];
    let generator = FallbackGenerator::new(providers, true);

    let generation = generator
        .generate(&request(Stance::Lens))
        .await
        .expect("second provider answers");

    assert_eq!(generation.provider_id, "second");
    assert!(!generation.fallback_used);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
    assert_eq!(generator.provider_ids(), vec!["first", "second"]);
}

#[tokio::test]
async fn given_all_providers_fail_when_mock_allowed_then_mock_marks_fallback() {
    let providers: Vec<Arc<dyn LlmProvider>> = vec![Arc::new(FlakyProvider::new(
        "only",
        vec![ProviderErrorKind::BackendPermanent],
    ))];
    let generator = FallbackGenerator::new(providers, true);

    let generation = generator
        .generate(&request(Stance::Lens))
        .await
        .expect("mock answers");

    assert_eq!(generation.provider_id, MOCK_PROVIDER_ID);
    assert!(generation.fallback_used);
    assert!(!generation.text.chars().any(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn given_no_providers_when_mock_allowed_then_mock_is_not_a_fallback() {
    let generator = FallbackGenerator::new(Vec::new(), true);

    let generation = generator
        .generate(&request(Stance::Sword))
        .await
        .expect("mock answers");

    assert_eq!(generation.provider_id, MOCK_PROVIDER_ID);
    assert!(!generation.fallback_used);
}

#[tokio::test]
async fn given_all_providers_fail_without_mock_when_generating_then_last_error_surfaces() {
    let providers: Vec<Arc<dyn LlmProvider>> = vec![
        Arc::new(FlakyProvider::new("a", vec![ProviderErrorKind::BackendPermanent])),
        Arc::new(FlakyProvider::new("b", vec![ProviderErrorKind::Authentication])),
    ];
    let generator = FallbackGenerator::new(providers, false);

    let err = generator
        .generate(&request(Stance::Lens))
        .await
        .expect_err("nothing can answer");

    assert_eq!(err.kind, ProviderErrorKind::Authentication);
}

#[tokio::test]
async fn given_nothing_configured_without_mock_when_generating_then_unavailable() {
    let generator = FallbackGenerator::new(Vec::new(), false);

    let err = generator
        .generate(&request(Stance::Lens))
        .await
        .expect_err("nothing configured");

    assert_eq!(err.kind, ProviderErrorKind::Unavailable);
}
