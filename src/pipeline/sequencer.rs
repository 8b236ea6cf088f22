use std::{future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    ack::{AckError, AckValidationReason, error::corrupt_record},
    intent::IntentResult,
    pipeline::{
        error::ServiceError,
        gate::{GateAction, GateId, GateResult},
        gates::{
            PersonalityContext,
            capability::{build_constraints, run_capability_gate},
            intent::run_intent_gate,
            invariant::{INVARIANT_VIOLATION, run_invariant_gate},
            lens::run_lens_gate,
            model::{ModelGateInput, ModelOutcome, PROVIDER_UNAVAILABLE, run_model_gate},
            personality::run_personality_gate,
            shield::{HARD_VETO, run_shield_gate},
            spark::run_spark_gate,
            stance::run_stance_gate,
        },
        result::{DebugTrace, PipelineResult, PipelineStatus, Transparency},
        state::PipelineState,
    },
    provider::GenerationRequest,
    registry::ServiceRegistry,
    shield::{RiskSummary, StakesLevel, control_response, fail_closed},
    types::{AuditId, PipelineInput, RequestId, Stance},
};

const ACK_STORE_UNAVAILABLE: &str = "ack_store_unavailable";
const ACK_EXPIRED: &str = "ack_expired";
const ACK_INVALID: &str = "ack_invalid";
const CANCELLED: &str = "cancelled";

const REFUSAL_TEXT: &str = "I can't help with this request because it could cause serious harm to you or others. \
If something difficult is going on, I'm glad to talk through safer options.";
const WITHHELD_TEXT: &str = "I couldn't put together an answer that passes my safety and accuracy checks, \
so I'm holding this one back. Please try rephrasing, or check an authoritative source.";
const ACK_EXPIRED_TEXT: &str =
    "That confirmation has expired. Send your request again if you'd still like to continue.";
const ACK_INVALID_TEXT: &str = "That confirmation isn't valid or has already been used. \
Send your request again if you'd still like to continue.";

/// Everything needed to resume a soft-vetoed turn once the user acknowledges it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SuspendedTurn {
    request_id: RequestId,
    audit_id: AuditId,
    input: PipelineInput,
    intent: IntentResult,
    risk: RiskSummary,
}

pub fn new_request_id() -> RequestId {
    format!("req_{}", Uuid::now_v7().simple())
}

pub fn new_audit_id() -> AuditId {
    format!("aud_{}", Uuid::now_v7().simple())
}

/// Runs one turn through the gates in their fixed order.
pub struct GateSequencer {
    services: Arc<ServiceRegistry>,
}

impl GateSequencer {
    pub fn new(services: Arc<ServiceRegistry>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    #[tracing::instrument(
        name = "pipeline_execute",
        target = "pipeline",
        skip_all,
        fields(request_id = tracing::field::Empty)
    )]
    pub async fn execute(
        &self,
        input: PipelineInput,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, ServiceError> {
        let request_id = input.request_id.clone().unwrap_or_else(new_request_id);
        tracing::Span::current().record("request_id", request_id.as_str());
        let mut state = self.new_state(request_id, input);
        tracing::info!(
            target: "pipeline",
            audit_id = %state.audit_id,
            input_length = state.input.message.chars().count(),
            history_turns = state.input.context.history.len(),
            "pipeline_started"
        );

        let started = Instant::now();
        let Some(gate) = guarded(
            cancel,
            run_intent_gate(self.services.intent_classifier.as_ref(), &state.input),
        )
        .await
        else {
            return Err(self.cancelled(state, GateId::Intent).await);
        };
        let gate = record(&mut state, gate, started);
        let intent = gate.output;
        state.intent = Some(intent.clone());

        let started = Instant::now();
        let Some(gate) = guarded(
            cancel,
            run_shield_gate(
                &self.services.risk_assessor,
                &state.input.message,
                &state.input.context,
                intent.domain,
            ),
        )
        .await
        else {
            return Err(self.cancelled(state, GateId::Shield).await);
        };
        let gate = record(&mut state, gate, started);
        let action = gate.action;
        let risk = gate.output;
        state.risk = Some(risk.clone());

        match action {
            GateAction::Stop => {
                state.stop(GateId::Shield, HARD_VETO);
                tracing::warn!(
                    target: "shield",
                    categories = ?risk.categories,
                    "hard_veto_withheld_generation"
                );
                Ok(self
                    .finish(state, PipelineStatus::Stopped, Some(REFUSAL_TEXT.to_string()), None)
                    .await)
            }
            GateAction::AwaitAck => self.suspend(state, intent, risk).await,
            _ if risk.control_trigger => Ok(self.respond_in_control(state, &risk).await),
            _ => self.continue_from_lens(state, cancel).await,
        }
    }

    /// Resolves a pending acknowledgment. Validation consumes the token at most once.
    #[tracing::instrument(
        name = "pipeline_submit_ack",
        target = "pipeline",
        skip_all,
        fields(request_id = tracing::field::Empty)
    )]
    pub async fn submit_ack(
        &self,
        ack_token: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, ServiceError> {
        let manager = &self.services.ack_manager;

        let suspended = match manager.load_payload(ack_token).await {
            Ok(raw) => raw.and_then(|raw| match serde_json::from_str::<SuspendedTurn>(&raw) {
                Ok(turn) => Some(turn),
                Err(err) => {
                    tracing::warn!(target: "ack", error = %err, "suspended_turn_unreadable");
                    None
                }
            }),
            Err(err) => {
                let state = self.new_state(new_request_id(), PipelineInput::new(String::new()));
                return Err(self.store_unavailable(state, err).await);
            }
        };

        let mut state = match &suspended {
            Some(turn) => {
                let mut state = self.new_state(turn.request_id.clone(), turn.input.clone());
                state.intent = Some(turn.intent.clone());
                state.risk = Some(turn.risk.clone());
                state
            }
            None => self.new_state(new_request_id(), PipelineInput::new(String::new())),
        };
        tracing::Span::current().record("request_id", state.request_id.as_str());

        let started = Instant::now();
        let validation = match manager.validate(ack_token, text).await {
            Ok(validation) => validation,
            Err(err) => return Err(self.store_unavailable(state, err).await),
        };

        match (validation.reason, validation.pending, suspended) {
            (AckValidationReason::Accepted, Some(pending), Some(turn)) => {
                self.discard_payload(ack_token).await;
                let mut risk = turn.risk;
                risk.apply_override(pending.audit_id.clone());
                tracing::info!(
                    target: "ack",
                    override_audit_id = %pending.audit_id,
                    suspended_audit_id = %turn.audit_id,
                    "soft_veto_overridden"
                );
                record(
                    &mut state,
                    GateResult::pass(GateId::Shield, ()),
                    started,
                );
                state.risk = Some(risk);
                self.continue_from_lens(state, cancel).await
            }
            (AckValidationReason::TextMismatch, Some(pending), _) => {
                record(
                    &mut state,
                    GateResult::hard_fail(GateId::Shield, (), GateAction::AwaitAck, "ack_text_mismatch"),
                    started,
                );
                let prompt = ack_prompt(&pending.required_text);
                state.pending_ack = Some(pending);
                Ok(self
                    .finish(
                        state,
                        PipelineStatus::AwaitingAck,
                        Some(prompt),
                        Some(AckValidationReason::TextMismatch),
                    )
                    .await)
            }
            (reason, _, _) => {
                self.discard_payload(ack_token).await;
                let (stop_reason, response, rejection) = match reason {
                    AckValidationReason::Expired => (ACK_EXPIRED, ACK_EXPIRED_TEXT, reason),
                    AckValidationReason::AlreadyConsumed => {
                        (ACK_INVALID, ACK_INVALID_TEXT, reason)
                    }
                    // Accepted without a resumable turn is as good as unknown.
                    _ => (ACK_INVALID, ACK_INVALID_TEXT, AckValidationReason::NotFound),
                };
                record(
                    &mut state,
                    GateResult::hard_fail(GateId::Shield, (), GateAction::Stop, stop_reason),
                    started,
                );
                state.stop(GateId::Shield, stop_reason);
                Ok(self
                    .finish(
                        state,
                        PipelineStatus::Stopped,
                        Some(response.to_string()),
                        Some(rejection),
                    )
                    .await)
            }
        }
    }

    fn new_state(&self, request_id: RequestId, input: PipelineInput) -> PipelineState {
        PipelineState::new(
            request_id,
            new_audit_id(),
            self.services.clock.now_ms(),
            input,
            self.services.pipeline.max_regenerations,
        )
    }

    async fn suspend(
        &self,
        mut state: PipelineState,
        intent: IntentResult,
        risk: RiskSummary,
    ) -> Result<PipelineResult, ServiceError> {
        let shield = self.services.shield_config();
        let ttl = Duration::from_secs(shield.ack_ttl_seconds.max(1));
        let categories: Vec<&str> = risk.categories.iter().map(|category| category.as_str()).collect();
        let reason = format!("soft_veto:{}", categories.join(","));

        let pending = match self
            .services
            .ack_manager
            .issue(&reason, &shield.ack_required_text, ttl, &state.audit_id)
            .await
        {
            Ok(pending) => pending,
            Err(err) => return Err(self.store_unavailable(state, err).await),
        };

        let turn = SuspendedTurn {
            request_id: state.request_id.clone(),
            audit_id: state.audit_id.clone(),
            input: state.input.clone(),
            intent,
            risk,
        };
        let attached = match serde_json::to_string(&turn) {
            Ok(payload) => {
                self.services
                    .ack_manager
                    .attach_payload(&pending.ack_token, payload, ttl)
                    .await
            }
            Err(err) => Err(corrupt_record(format!("suspended turn not serializable: {err}"))),
        };
        if let Err(err) = attached {
            return Err(self.store_unavailable(state, err).await);
        }

        tracing::info!(
            target: "ack",
            reason = %pending.reason,
            expires_at = %pending.expires_at,
            "ack_required"
        );
        let prompt = ack_prompt(&pending.required_text);
        state.pending_ack = Some(pending);
        Ok(self
            .finish(state, PipelineStatus::AwaitingAck, Some(prompt), None)
            .await)
    }

    /// Critical stakes skip lens, capability, generation and spark entirely.
    async fn respond_in_control(&self, mut state: PipelineState, risk: &RiskSummary) -> PipelineResult {
        let intent = state.intent.clone().unwrap_or_else(IntentResult::conservative);
        let gate = record(&mut state, run_stance_gate(risk, &intent), Instant::now());
        state.stance = Some(gate.output);

        let session_end = risk.session_end_recommended;
        let response = control_response(&risk.crisis_resources, session_end);
        state.mark_crisis(session_end);
        state.validated_output = Some(response.clone());
        tracing::warn!(
            target: "shield",
            session_ended = session_end,
            resources = risk.crisis_resources.len(),
            "control_stance_engaged"
        );

        let started = Instant::now();
        let gate = run_invariant_gate(&self.services.invariants, &state, state.response(), false);
        let gate = record(&mut state, gate, started);
        let action = gate.action;
        state.invariant = Some(gate.output);
        let status = if action == GateAction::Stop {
            state.stop(GateId::Invariant, INVARIANT_VIOLATION);
            PipelineStatus::Stopped
        } else {
            PipelineStatus::Success
        };
        self.finish(state, status, Some(response), None).await
    }

    async fn continue_from_lens(
        &self,
        mut state: PipelineState,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, ServiceError> {
        let services = &self.services;
        let intent = state.intent.clone().unwrap_or_else(IntentResult::conservative);
        let risk = state
            .risk
            .clone()
            .unwrap_or_else(|| fail_closed("risk summary missing on resume"));

        let started = Instant::now();
        let Some(gate) = guarded(
            cancel,
            run_lens_gate(&services.verifier, &state.input.message, &intent),
        )
        .await
        else {
            return Err(self.cancelled(state, GateId::Lens).await);
        };
        let gate = record(&mut state, gate, started);
        let lens = gate.output;
        state.lens = Some(lens.clone());

        let gate = record(&mut state, run_stance_gate(&risk, &intent), Instant::now());
        let stance = gate.output;
        state.stance = Some(stance);

        let spark_enabled = services.flags.spark;
        let gate = record(
            &mut state,
            run_capability_gate(&services.capability_checker, stance, &intent, &lens, spark_enabled),
            Instant::now(),
        );
        let report = gate.output;
        state.capabilities = Some(report.clone());

        let mut constraints = build_constraints(stance, &lens, &report);
        state.constraints = Some(constraints.clone());

        let personality_context = PersonalityContext {
            stance,
            intervention: risk.intervention,
            override_applied: risk.override_applied,
            confidence: Some(lens.confidence),
            freshness_warning: lens.constraints.freshness_warning.clone(),
        };
        let high_stakes = risk.stakes >= StakesLevel::High;
        let mut invariant_retry_used = false;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(state, GateId::Model).await);
            }
            let request = GenerationRequest {
                request_id: state.request_id.clone(),
                message: state.input.message.clone(),
                history: state.input.context.history.clone(),
                constraints: constraints.clone(),
                attempt: state.regeneration_count(),
            };
            let started = Instant::now();
            let Some(gate) = guarded(
                cancel,
                run_model_gate(
                    &services.generator,
                    ModelGateInput {
                        request: &request,
                        lens_constraints: &lens.constraints,
                        high_stakes,
                        user_message: &state.input.message,
                    },
                ),
            )
            .await
            else {
                return Err(self.cancelled(state, GateId::Model).await);
            };
            let gate = record(&mut state, gate, started);
            let model_action = gate.action;
            let draft = match gate.output {
                ModelOutcome::Drafted(draft) => draft,
                ModelOutcome::Unavailable(source) => {
                    state.stop(GateId::Model, PROVIDER_UNAVAILABLE);
                    let err = ServiceError::ProvidersUnavailable {
                        audit_id: state.audit_id.clone(),
                        source,
                    };
                    return Err(self.fail(state, err).await);
                }
            };
            state.generation = Some(draft.generation.clone());
            state.leak_guard = Some(draft.leak_guard.clone());

            if model_action == GateAction::Regenerate {
                if state.try_regenerate() {
                    if let Some(tightened) = draft.tightened {
                        constraints = tightened;
                        state.constraints = Some(constraints.clone());
                    }
                    tracing::debug!(
                        target: "pipeline",
                        attempt = state.regeneration_count(),
                        "regenerating_after_model_gate"
                    );
                    continue;
                }
                state.mark_degraded();
                tracing::warn!(target: "pipeline", "regeneration_budget_exhausted");
            }

            let gate = record(
                &mut state,
                run_personality_gate(services.personality.as_ref(), &draft.text, &personality_context),
                Instant::now(),
            );
            let personality_action = gate.action;
            let styled = gate.output;
            if personality_action == GateAction::Regenerate {
                if state.try_regenerate() {
                    for phrase in styled.avoid_phrases {
                        if !constraints.avoid_phrases.contains(&phrase) {
                            constraints.avoid_phrases.push(phrase);
                        }
                    }
                    state.constraints = Some(constraints.clone());
                    continue;
                }
                state.mark_degraded();
                tracing::warn!(target: "pipeline", "regeneration_budget_exhausted");
            }
            state.validated_output = Some(styled.text);

            let gate = record(
                &mut state,
                run_spark_gate(spark_enabled, stance, &intent, &report),
                Instant::now(),
            );
            state.spark = gate.output;

            let can_regenerate = !invariant_retry_used && state.regenerations_remaining();
            let started = Instant::now();
            let gate = run_invariant_gate(&services.invariants, &state, state.response(), can_regenerate);
            let gate = record(&mut state, gate, started);
            let invariant_action = gate.action;
            state.invariant = Some(gate.output);

            match invariant_action {
                GateAction::Regenerate => {
                    invariant_retry_used = true;
                    state.try_regenerate();
                    constraints.forbid_numeric = true;
                    constraints.require_qualification = true;
                    if constraints.freshness_warning.is_none() {
                        constraints.freshness_warning = lens.constraints.freshness_warning.clone();
                    }
                    state.constraints = Some(constraints.clone());
                    state.spark = None;
                    continue;
                }
                GateAction::Stop => {
                    state.stop(GateId::Invariant, INVARIANT_VIOLATION);
                    return Ok(self
                        .finish(
                            state,
                            PipelineStatus::Stopped,
                            Some(WITHHELD_TEXT.to_string()),
                            None,
                        )
                        .await);
                }
                _ => {
                    if state
                        .invariant
                        .as_ref()
                        .is_some_and(|output| !output.non_critical_violations.is_empty())
                    {
                        state.mark_degraded();
                    }
                }
            }
            break;
        }

        let response = state.validated_output.clone();
        Ok(self
            .finish(state, PipelineStatus::Success, response, None)
            .await)
    }

    async fn discard_payload(&self, ack_token: &str) {
        if let Err(err) = self.services.ack_manager.discard_payload(ack_token).await {
            tracing::warn!(target: "ack", error = %err, "suspended_turn_discard_failed");
        }
    }

    async fn store_unavailable(&self, mut state: PipelineState, source: AckError) -> ServiceError {
        tracing::error!(target: "ack", error = %source, "ack_store_unavailable");
        state.stop(GateId::Shield, ACK_STORE_UNAVAILABLE);
        let err = ServiceError::StoreUnavailable {
            audit_id: state.audit_id.clone(),
            source,
        };
        self.fail(state, err).await
    }

    async fn cancelled(&self, mut state: PipelineState, gate: GateId) -> ServiceError {
        tracing::info!(target: "pipeline", gate = gate.as_str(), "pipeline_cancelled");
        state.stop(gate, CANCELLED);
        self.write_audit(&state, PipelineStatus::Stopped, None, true).await;
        ServiceError::Cancelled {
            audit_id: state.audit_id,
        }
    }

    async fn fail(&self, state: PipelineState, err: ServiceError) -> ServiceError {
        tracing::error!(
            target: "pipeline",
            code = err.code(),
            stopped_at = state.stopped().map(|stop| stop.gate.as_str()),
            "pipeline_failed"
        );
        self.write_audit(&state, PipelineStatus::Stopped, None, false).await;
        err
    }

    async fn finish(
        &self,
        state: PipelineState,
        status: PipelineStatus,
        response: Option<String>,
        ack_rejection: Option<AckValidationReason>,
    ) -> PipelineResult {
        self.write_audit(&state, status, response.as_deref(), false).await;
        tracing::info!(
            target: "pipeline",
            status = status.as_str(),
            stance = state.stance.map(Stance::as_str),
            stopped_at = state.stopped().map(|stop| stop.gate.as_str()),
            regeneration_count = state.regeneration_count(),
            degraded = state.is_degraded(),
            "pipeline_completed"
        );
        self.assemble(state, status, response, ack_rejection)
    }

    /// The audit record is written on every terminal path; a failing sink never fails the turn.
    async fn write_audit(
        &self,
        state: &PipelineState,
        status: PipelineStatus,
        response: Option<&str>,
        cancelled: bool,
    ) {
        match self
            .services
            .audit_builder
            .build(state, status, response, cancelled)
        {
            Ok(audit) => {
                if let Err(err) = self.services.audit_sink.emit(&audit).await {
                    tracing::error!(
                        target: "audit",
                        audit_id = %state.audit_id,
                        error = %err,
                        "audit_sink_failed"
                    );
                }
            }
            Err(err) => {
                tracing::error!(
                    target: "audit",
                    audit_id = %state.audit_id,
                    error = %err,
                    "audit_build_failed"
                );
            }
        }
    }

    fn assemble(
        &self,
        state: PipelineState,
        status: PipelineStatus,
        response: Option<String>,
        ack_rejection: Option<AckValidationReason>,
    ) -> PipelineResult {
        let lens = state.lens.as_ref();
        let risk = state.risk.as_ref();
        let confidence = lens.map(|lens| lens.confidence);

        let debug = (state.input.debug && self.services.pipeline.debug_trace).then(|| DebugTrace {
            gates: state.gate_records.clone(),
            stakes: risk.map(|risk| risk.stakes),
            intervention: risk.map(|risk| risk.intervention),
            risk_score: lens.map(|lens| lens.risk_score),
            tier: lens.map(|lens| lens.tier),
            constraints: state.constraints.clone(),
        });

        let transparency = Transparency {
            model: state.generation.as_ref().map(|generation| generation.model.clone()),
            provider_id: state
                .generation
                .as_ref()
                .map(|generation| generation.provider_id.clone()),
            fallback_used: state
                .generation
                .as_ref()
                .is_some_and(|generation| generation.fallback_used),
            verification_status: confidence
                .map(|confidence| confidence.as_str())
                .unwrap_or("not_applicable")
                .to_string(),
            regeneration_count: state.regeneration_count(),
            degraded: state.is_degraded(),
            violations: state
                .invariant
                .as_ref()
                .map(|output| output.all_violations())
                .unwrap_or_default(),
            override_applied: risk.is_some_and(|risk| risk.override_applied),
        };

        let crisis_resources = if state.crisis_resources_provided() {
            risk.map(|risk| risk.crisis_resources.clone()).unwrap_or_default()
        } else {
            Vec::new()
        };

        PipelineResult {
            request_id: state.request_id.clone(),
            audit_id: state.audit_id.clone(),
            status,
            response,
            stance: state.stance,
            confidence,
            verified: lens.is_some_and(|lens| lens.is_verified()),
            freshness_warning: lens
                .filter(|lens| lens.confidence.is_degraded_or_worse())
                .and_then(|lens| lens.constraints.freshness_warning.clone()),
            spark: if status == PipelineStatus::Success {
                state.spark.clone()
            } else {
                None
            },
            pending_ack: state.pending_ack.clone(),
            ack_rejection,
            stopped_at: state.stopped().map(|stop| stop.gate),
            stop_reason: state.stopped().map(|stop| stop.reason.clone()),
            crisis_resources,
            session_ended: state.session_ended(),
            transparency,
            debug,
        }
    }
}

fn ack_prompt(required_text: &str) -> String {
    format!(
        "This request carries real risk, so I need a clear confirmation before going further. \
If you still want to continue, reply with exactly: \"{required_text}\""
    )
}

/// Races a gate against cancellation; `None` means the token fired first.
async fn guarded<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

fn record<T>(state: &mut PipelineState, gate: GateResult<T>, started: Instant) -> GateResult<T> {
    let gate = gate.with_elapsed_ms(started.elapsed().as_millis() as u64);
    debug_assert!(gate.is_consistent(), "inconsistent gate verdict from {:?}", gate.gate_id);
    state.record(gate.record(state.regeneration_count()));
    tracing::debug!(
        target: "pipeline",
        gate = gate.gate_id.as_str(),
        status = ?gate.status,
        action = ?gate.action,
        failure_reason = gate.failure_reason.as_deref(),
        elapsed_ms = gate.execution_time_ms,
        "gate_completed"
    );
    gate
}
