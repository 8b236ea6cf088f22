use std::sync::{Arc, atomic::Ordering};

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use gatehouse::{
    pipeline::PipelineStatus,
    provider::LlmProvider,
    registry::PipelineConfig,
    types::PipelineInput,
};

use crate::support::{AlwaysObjecting, Harness, ScriptedProvider};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn given_personality_that_always_objects_when_executed_then_regenerations_stop_at_budget(
        max_regenerations in 0u32..4,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        runtime.block_on(async {
            let provider = Arc::new(ScriptedProvider::new(
                "Put the egg in boiling water and wait until the yolk sets.",
            ));
            let personality = Arc::new(AlwaysObjecting::default());
            let llm: Arc<dyn LlmProvider> = provider.clone();
            let harness = Harness::build(|builder| {
                builder
                    .with_llm_providers(vec![llm])
                    .with_mock_fallback(false)
                    .with_personality(personality.clone())
                    .with_pipeline_config(PipelineConfig {
                        max_regenerations,
                        ..PipelineConfig::default()
                    })
            });

            let result = harness
                .sequencer
                .execute(PipelineInput::new("How do I boil an egg?"), &CancellationToken::new())
                .await
                .expect("exhausted budget degrades instead of failing");

            prop_assert_eq!(result.status, PipelineStatus::Success);
            prop_assert_eq!(result.transparency.regeneration_count, max_regenerations);
            prop_assert!(result.transparency.degraded);
            prop_assert_eq!(provider.calls(), max_regenerations as usize + 1);
            prop_assert_eq!(
                personality.calls.load(Ordering::SeqCst),
                max_regenerations as usize + 1
            );

            let audit = harness
                .audit
                .find(&result.audit_id)
                .await
                .expect("audit record written");
            prop_assert_eq!(audit.content().regeneration_count, max_regenerations);
            prop_assert!(audit.content().degraded);
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn given_objection_when_regenerating_then_next_request_avoids_the_flagged_phrase() {
    let provider = Arc::new(ScriptedProvider::new("Boil it for a while."));
    let llm: Arc<dyn LlmProvider> = provider.clone();
    let harness = Harness::build(|builder| {
        builder
            .with_llm_providers(vec![llm])
            .with_mock_fallback(false)
            .with_personality(Arc::new(AlwaysObjecting::default()))
            .with_pipeline_config(PipelineConfig {
                max_regenerations: 1,
                ..PipelineConfig::default()
            })
    });

    harness
        .sequencer
        .execute(PipelineInput::new("How do I boil an egg?"), &CancellationToken::new())
        .await
        .expect("turn completes");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(
        requests[1]
            .constraints
            .avoid_phrases
            .iter()
            .any(|phrase| phrase == "objection 0"),
        "second request: {:?}",
        requests[1].constraints
    );
}
