use std::sync::{Arc, atomic::Ordering};

use tokio_util::sync::CancellationToken;

use gatehouse::{
    invariant::{
        InvariantEvaluator, InvariantPredicate, default_registry,
        registry::NO_UNVERIFIED_NUMBERS_HIGH_STAKES,
    },
    pipeline::{GateId, PipelineResult, PipelineStatus},
    provider::LlmProvider,
    registry::PipelineConfig,
    shield::StakesLevel,
    types::PipelineInput,
};

use crate::support::{AppendsFigure, Harness, ScriptedProvider};

const EGG: &str = "Put the egg in boiling water and wait until the yolk sets.";

/// The number invariant applied at every stakes level, so any unlicensed figure is critical.
fn strict_numbers() -> InvariantEvaluator {
    let mut registry = default_registry();
    for definition in &mut registry {
        if definition.id == NO_UNVERIFIED_NUMBERS_HIGH_STAKES {
            definition.predicate = InvariantPredicate::NoUnlicensedNumbersWhenStakesAtLeast {
                stakes: StakesLevel::Low,
            };
        }
    }
    InvariantEvaluator::new(registry)
}

async fn run(max_regenerations: u32) -> (Harness, Arc<ScriptedProvider>, Arc<AppendsFigure>, PipelineResult) {
    let provider = Arc::new(ScriptedProvider::new(EGG));
    let personality = Arc::new(AppendsFigure::default());
    let llm: Arc<dyn LlmProvider> = provider.clone();
    let harness = Harness::build(|builder| {
        builder
            .with_llm_providers(vec![llm])
            .with_mock_fallback(false)
            .with_personality(personality.clone())
            .with_invariants(strict_numbers())
            .with_pipeline_config(PipelineConfig {
                max_regenerations,
                ..PipelineConfig::default()
            })
    });

    let result = harness
        .sequencer
        .execute(PipelineInput::new("How do I boil an egg?"), &CancellationToken::new())
        .await
        .expect("an invariant stop is not a service error");
    (harness, provider, personality, result)
}

#[tokio::test]
async fn given_critical_violation_that_persists_when_budget_remains_then_one_retry_then_stop() {
    let (harness, provider, personality, result) = run(2).await;

    assert_eq!(provider.calls(), 2, "exactly one forced regeneration");
    assert_eq!(personality.calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.transparency.regeneration_count, 1);
    assert_eq!(result.status, PipelineStatus::Stopped);
    assert_eq!(result.stopped_at, Some(GateId::Invariant));
    assert_eq!(result.stop_reason.as_deref(), Some("invariant_violation"));
    let response = result.response.as_deref().unwrap_or_default();
    assert!(!response.contains("5550100"), "violating text released: {response}");
    assert!(result.spark.is_none());

    let retried = &provider.requests()[1];
    assert!(retried.constraints.forbid_numeric);
    assert!(retried.constraints.require_qualification);

    let audit = harness
        .audit
        .find(&result.audit_id)
        .await
        .expect("invariant stops are audited");
    assert_eq!(audit.status(), PipelineStatus::Stopped);
    assert!(
        audit
            .content()
            .critical_violations
            .iter()
            .any(|id| id == NO_UNVERIFIED_NUMBERS_HIGH_STAKES),
        "{:?}",
        audit.content().critical_violations
    );
}

#[tokio::test]
async fn given_critical_violation_when_no_budget_remains_then_stopped_without_retry() {
    let (harness, provider, _personality, result) = run(0).await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(result.transparency.regeneration_count, 0);
    assert_eq!(result.status, PipelineStatus::Stopped);
    assert_eq!(result.stopped_at, Some(GateId::Invariant));
    assert_eq!(result.stop_reason.as_deref(), Some("invariant_violation"));

    let audit = harness
        .audit
        .find(&result.audit_id)
        .await
        .expect("invariant stops are audited");
    assert!(!audit.content().critical_violations.is_empty());
}
