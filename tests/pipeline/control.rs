use std::sync::Arc;

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use gatehouse::{
    pipeline::{GateId, PipelineStatus},
    provider::LlmProvider,
    shield::{HarmCategory, RiskClassification, StakesLevel},
    types::{PipelineInput, Stance},
};

use crate::support::{FixedRisk, Harness, ScriptedProvider};

fn harm_category() -> impl Strategy<Value = HarmCategory> {
    prop_oneof![
        Just(HarmCategory::SelfHarm),
        Just(HarmCategory::Violence),
        Just(HarmCategory::Weapons),
        Just(HarmCategory::IllegalActivity),
        Just(HarmCategory::RiskyFinancialAction),
        Just(HarmCategory::RiskyMedicalAction),
        Just(HarmCategory::DangerousActivity),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn given_critical_stakes_with_any_categories_when_executed_then_control_skips_downstream_gates(
        categories in proptest::collection::vec(harm_category(), 0..4),
        imminent in any::<bool>(),
        message in "[a-z ]{1,40}",
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        runtime.block_on(async {
            let provider = Arc::new(ScriptedProvider::new("figures: 42"));
            let classification = RiskClassification {
                stakes: StakesLevel::Critical,
                categories,
                triggers: vec!["scripted".to_string()],
                imminent,
            };
            let llm: Arc<dyn LlmProvider> = provider.clone();
            let harness = Harness::build(|builder| {
                builder
                    .with_risk_classifier(Arc::new(FixedRisk(classification)))
                    .with_llm_providers(vec![llm])
                    .with_mock_fallback(false)
            });

            let result = harness
                .sequencer
                .execute(PipelineInput::new(message), &CancellationToken::new())
                .await
                .expect("control path never errors");

            prop_assert_eq!(result.status, PipelineStatus::Success);
            prop_assert_eq!(result.stance, Some(Stance::Control));
            prop_assert!(!result.crisis_resources.is_empty());
            prop_assert_eq!(result.session_ended, imminent);
            prop_assert!(result.spark.is_none());
            prop_assert_eq!(provider.calls(), 0);

            let audit = harness
                .audit
                .find(&result.audit_id)
                .await
                .expect("audit record written");
            let ran: Vec<GateId> = audit
                .content()
                .gate_trace
                .iter()
                .map(|record| record.gate_id)
                .collect();
            for skipped in [GateId::Lens, GateId::Capability, GateId::Model, GateId::Spark] {
                prop_assert!(!ran.contains(&skipped), "{:?} ran under control: {:?}", skipped, ran);
            }
            prop_assert!(audit.content().crisis_resources_provided);
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn given_crisis_earlier_in_conversation_when_followup_is_mild_then_stakes_stay_elevated() {
    use gatehouse::types::{ConversationContext, ConversationTurn, TurnRole};

    let harness = Harness::with_provider(Arc::new(ScriptedProvider::new(
        "It sounds like a lot is going on. I'm here to listen.",
    )));
    let context = ConversationContext {
        session_id: Some("session-1".to_string()),
        user_id: None,
        history: vec![ConversationTurn {
            role: TurnRole::User,
            text: "I want to end my life".to_string(),
        }],
    };

    let result = harness
        .sequencer
        .execute(
            PipelineInput::new("anyway, what should I eat for dinner").with_context(context),
            &CancellationToken::new(),
        )
        .await
        .expect("follow-up succeeds");

    let audit = harness
        .audit
        .find(&result.audit_id)
        .await
        .expect("audit record written");
    let shield = audit.content().shield.as_ref().expect("shield audited");
    assert!(shield.stakes >= StakesLevel::Medium);
    assert_eq!(audit.content().session_id.as_deref(), Some("session-1"));
}
