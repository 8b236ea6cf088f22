use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use gatehouse::{
    pipeline::{GateId, PipelineStatus, ServiceError},
    types::PipelineInput,
};

use crate::support::{DownProvider, Harness, StalledProvider, UnavailableStore};

#[tokio::test]
async fn given_every_provider_down_without_mock_when_executed_then_unavailable_error_is_audited() {
    let harness = Harness::with_provider(Arc::new(DownProvider));

    let err = harness
        .sequencer
        .execute(PipelineInput::new("How do I boil an egg?"), &CancellationToken::new())
        .await
        .expect_err("no provider can answer");

    assert!(matches!(err, ServiceError::ProvidersUnavailable { .. }), "{err:?}");
    assert_eq!(err.code(), "providers_unavailable");
    assert!(!err.to_string().contains("secret"), "{err}");

    let audit_id = err.audit_id().expect("failure carries its audit id");
    let audit = harness
        .audit
        .find(audit_id)
        .await
        .expect("failures are audited");
    assert_eq!(audit.content().stopped_at, Some(GateId::Model));
    assert!(audit.content().response_hash.is_none());
}

#[tokio::test]
async fn given_ack_store_down_when_soft_veto_issued_then_fails_closed_with_audit() {
    let harness = Harness::build(|builder| builder.with_kv_store(Arc::new(UnavailableStore)));

    let err = harness
        .sequencer
        .execute(
            PipelineInput::new("Should I put all my savings into crypto?"),
            &CancellationToken::new(),
        )
        .await
        .expect_err("a soft veto cannot be issued without a store");

    assert!(matches!(err, ServiceError::StoreUnavailable { .. }), "{err:?}");
    let audit = harness
        .audit
        .find(err.audit_id().expect("audit id"))
        .await
        .expect("store failure audited");
    assert_eq!(audit.content().stopped_at, Some(GateId::Shield));
    assert_eq!(
        audit.content().stop_reason.as_deref(),
        Some("ack_store_unavailable")
    );
}

#[tokio::test]
async fn given_ack_store_down_when_ack_submitted_then_store_unavailable() {
    let harness = Harness::build(|builder| builder.with_kv_store(Arc::new(UnavailableStore)));

    let err = harness
        .sequencer
        .submit_ack("ack_anything", "I understand the risks", &CancellationToken::new())
        .await
        .expect_err("token state cannot be read");

    assert_eq!(err.code(), "store_unavailable");
    assert!(harness.audit.find(err.audit_id().expect("audit id")).await.is_some());
}

#[tokio::test]
async fn given_stalled_provider_when_cancelled_then_cancelled_error_is_audited() {
    let harness = Harness::with_provider(Arc::new(StalledProvider));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        harness
            .sequencer
            .execute(PipelineInput::new("How do I boil an egg?"), &cancel),
    )
    .await
    .expect("cancellation is observed promptly")
    .expect_err("cancelled turns return an error");

    assert!(matches!(err, ServiceError::Cancelled { .. }), "{err:?}");
    let audit = harness
        .audit
        .find(err.audit_id().expect("audit id"))
        .await
        .expect("cancelled turn audited");
    assert!(audit.content().cancelled);
    assert_eq!(audit.content().stopped_at, Some(GateId::Model));
    assert_ne!(audit.status(), PipelineStatus::Success);
}

#[tokio::test]
async fn given_cancelled_token_when_executed_then_nothing_is_generated() {
    let harness = Harness::with_provider(Arc::new(StalledProvider));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness
        .sequencer
        .execute(PipelineInput::new("How do I boil an egg?"), &cancel)
        .await
        .expect_err("pre-cancelled turn never runs");

    assert_eq!(err.code(), "cancelled");
    let audit = harness
        .audit
        .find(err.audit_id().expect("audit id"))
        .await
        .expect("cancelled turn audited");
    assert!(audit.content().generation.is_none());
}
