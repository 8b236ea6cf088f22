use std::sync::Arc;

use futures_util::future::join_all;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use gatehouse::{
    ack::AckValidationReason,
    pipeline::{GateId, PipelineResult, PipelineStatus},
};
use gatehouse::types::PipelineInput;

use crate::support::{Harness, ScriptedProvider};

const RISKY: &str = "Should I put all my savings into crypto?";
const REQUIRED: &str = "I understand the risks";
const ADVICE: &str = "Spreading money across different assets lowers the damage any single one can do.";

async fn suspended(harness: &Harness) -> PipelineResult {
    let result = harness
        .sequencer
        .execute(PipelineInput::new(RISKY), &CancellationToken::new())
        .await
        .expect("soft veto suspends instead of failing");
    assert_eq!(result.status, PipelineStatus::AwaitingAck);
    result
}

#[tokio::test]
async fn given_soft_veto_when_executed_then_awaits_ack_without_generating() {
    let provider = Arc::new(ScriptedProvider::new(ADVICE));
    let harness = Harness::with_provider(provider.clone());

    let result = suspended(&harness).await;

    let pending = result.pending_ack.as_ref().expect("pending ack returned");
    assert_eq!(pending.required_text, REQUIRED);
    assert!(pending.expires_at_ms > crate::support::START_MS);
    let prompt = result.response.as_deref().expect("ack prompt returned");
    assert!(prompt.contains(REQUIRED), "prompt: {prompt}");
    assert_eq!(provider.calls(), 0);

    let audit = harness
        .audit
        .find(&result.audit_id)
        .await
        .expect("suspension is audited");
    assert_eq!(audit.status(), PipelineStatus::AwaitingAck);
    let pending_hash = audit
        .content()
        .pending_ack_hash
        .as_deref()
        .expect("token recorded by hash");
    assert!(!pending_hash.contains(&pending.ack_token));
}

#[tokio::test]
async fn given_pending_ack_when_text_mismatches_then_token_survives_and_exact_text_resumes() {
    let provider = Arc::new(ScriptedProvider::new(ADVICE));
    let harness = Harness::with_provider(provider.clone());
    let first = suspended(&harness).await;
    let token = first.pending_ack.expect("pending ack").ack_token;
    let cancel = CancellationToken::new();

    let mismatch = harness
        .sequencer
        .submit_ack(&token, "yeah whatever", &cancel)
        .await
        .expect("mismatch is not an error");
    assert_eq!(mismatch.status, PipelineStatus::AwaitingAck);
    assert_eq!(mismatch.ack_rejection, Some(AckValidationReason::TextMismatch));
    assert_eq!(
        mismatch.pending_ack.as_ref().map(|pending| pending.ack_token.as_str()),
        Some(token.as_str())
    );
    assert_eq!(provider.calls(), 0);

    let accepted = harness
        .sequencer
        .submit_ack(&token, REQUIRED, &cancel)
        .await
        .expect("accepted ack resumes the turn");
    assert_eq!(accepted.status, PipelineStatus::Success);
    assert_eq!(accepted.request_id, first.request_id);
    assert_ne!(accepted.audit_id, first.audit_id);
    assert!(accepted.transparency.override_applied);
    assert_eq!(accepted.response.as_deref().map(|text| text.contains("assets")), Some(true));
    assert_eq!(provider.calls(), 1);

    let audit = harness
        .audit
        .find(&accepted.audit_id)
        .await
        .expect("resumed turn audited");
    let shield = audit.content().shield.as_ref().expect("shield audited");
    assert!(shield.override_applied);
    assert_eq!(shield.override_audit_id.as_deref(), Some(first.audit_id.as_str()));
}

#[tokio::test]
async fn given_consumed_token_when_resubmitted_then_stopped_as_already_consumed() {
    let harness = Harness::with_provider(Arc::new(ScriptedProvider::new(ADVICE)));
    let token = suspended(&harness).await.pending_ack.expect("pending").ack_token;
    let cancel = CancellationToken::new();

    harness
        .sequencer
        .submit_ack(&token, REQUIRED, &cancel)
        .await
        .expect("first submission accepted");
    let replay = harness
        .sequencer
        .submit_ack(&token, REQUIRED, &cancel)
        .await
        .expect("replay is a stop, not an error");

    assert_eq!(replay.status, PipelineStatus::Stopped);
    assert_eq!(replay.stopped_at, Some(GateId::Shield));
    assert_eq!(replay.ack_rejection, Some(AckValidationReason::AlreadyConsumed));
    assert_eq!(replay.stop_reason.as_deref(), Some("ack_invalid"));
}

#[tokio::test]
async fn given_ttl_elapsed_when_ack_submitted_then_stopped_as_expired() {
    let provider = Arc::new(ScriptedProvider::new(ADVICE));
    let harness = Harness::with_provider(provider.clone());
    let token = suspended(&harness).await.pending_ack.expect("pending").ack_token;

    harness.clock.advance_ms(301_000);
    let result = harness
        .sequencer
        .submit_ack(&token, REQUIRED, &CancellationToken::new())
        .await
        .expect("expiry is a stop, not an error");

    assert_eq!(result.status, PipelineStatus::Stopped);
    assert_eq!(result.ack_rejection, Some(AckValidationReason::Expired));
    assert_eq!(result.stop_reason.as_deref(), Some("ack_expired"));
    assert_eq!(provider.calls(), 0);

    let again = harness
        .sequencer
        .submit_ack(&token, REQUIRED, &CancellationToken::new())
        .await
        .expect("second attempt also stops");
    assert_eq!(again.status, PipelineStatus::Stopped);
    assert_ne!(again.ack_rejection, Some(AckValidationReason::Accepted));
}

#[tokio::test]
async fn given_unknown_token_when_submitted_then_stopped_as_not_found() {
    let harness = Harness::with_provider(Arc::new(ScriptedProvider::new(ADVICE)));

    let result = harness
        .sequencer
        .submit_ack("ack_made_up", REQUIRED, &CancellationToken::new())
        .await
        .expect("unknown token is a stop, not an error");

    assert_eq!(result.status, PipelineStatus::Stopped);
    assert_eq!(result.ack_rejection, Some(AckValidationReason::NotFound));
    assert!(harness.audit.find(&result.audit_id).await.is_some());
}

async fn race_submissions(contenders: usize) -> (usize, usize) {
    let provider = Arc::new(ScriptedProvider::new(ADVICE));
    let harness = Harness::with_provider(provider.clone());
    let token = suspended(&harness).await.pending_ack.expect("pending").ack_token;
    let cancel = CancellationToken::new();

    let outcomes = join_all(
        (0..contenders).map(|_| harness.sequencer.submit_ack(&token, REQUIRED, &cancel)),
    )
    .await;
    let successes = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Ok(result) if result.status == PipelineStatus::Success))
        .count();
    (successes, provider.calls())
}

#[tokio::test]
async fn given_concurrent_submissions_when_racing_then_exactly_one_resumes() {
    let (successes, calls) = race_submissions(8).await;
    assert_eq!(successes, 1);
    assert_eq!(calls, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn given_any_number_of_contenders_when_racing_then_token_is_single_use(contenders in 1usize..12) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        let (successes, calls) = runtime.block_on(race_submissions(contenders));
        prop_assert_eq!(successes, 1);
        prop_assert_eq!(calls, 1);
    }
}
