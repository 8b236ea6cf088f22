use std::sync::Arc;

use crate::{
    audit::{
        error::AuditError,
        types::{
            AuditContent, GenerationAudit, IntentAudit, LensAudit, PolicyVersions, ResponseAudit,
            ShieldAudit, sha256_hex,
        },
    },
    clock::{Clock, format_rfc3339_ms},
    pipeline::{result::PipelineStatus, state::PipelineState},
};

/// Turns a finished pipeline state into a sealed audit record.
pub struct AuditBuilder {
    policy_versions: PolicyVersions,
    clock: Arc<dyn Clock>,
}

impl AuditBuilder {
    pub fn new(policy_versions: PolicyVersions, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy_versions,
            clock,
        }
    }

    pub fn policy_versions(&self) -> &PolicyVersions {
        &self.policy_versions
    }

    pub fn build(
        &self,
        state: &PipelineState,
        status: PipelineStatus,
        response: Option<&str>,
        cancelled: bool,
    ) -> Result<ResponseAudit, AuditError> {
        let created_at_ms = self.clock.now_ms();
        let invariant = state.invariant.clone().unwrap_or_default();

        let content = AuditContent {
            audit_id: state.audit_id.clone(),
            request_id: state.request_id.clone(),
            session_id: state.input.context.session_id.clone(),
            created_at: format_rfc3339_ms(created_at_ms),
            created_at_ms,
            duration_ms: created_at_ms.saturating_sub(state.started_at_ms).max(0) as u64,
            status,
            cancelled,
            input_hash: sha256_hex(&state.input.message),
            input_length: state.input.message.chars().count(),
            response_hash: response.map(sha256_hex),
            response_length: response.map(|text| text.chars().count()).unwrap_or_default(),
            intent: state.intent.as_ref().map(|intent| IntentAudit {
                kind: intent.kind,
                domain: intent.domain,
                fallback: intent.fallback,
            }),
            shield: state.risk.as_ref().map(|risk| ShieldAudit {
                stakes: risk.stakes,
                intervention: risk.intervention,
                veto_type: risk.veto_type,
                control_trigger: risk.control_trigger,
                categories: risk.categories.clone(),
                classification_failed: risk.classification_failed,
                override_applied: risk.override_applied,
                override_audit_id: risk.override_audit_id.clone(),
            }),
            lens: state.lens.as_ref().map(|lens| LensAudit {
                tier: lens.tier,
                mode: lens.mode,
                risk_score: lens.risk_score,
                force_high: lens.force_high,
                confidence: lens.confidence,
                retrieval: lens.retrieval,
                requirements_met: lens.requirements_met,
                degradation_reason: lens.degradation_reason,
                evidence_urls: lens
                    .evidence
                    .as_ref()
                    .map(|pack| pack.items.iter().map(|item| item.url.clone()).collect())
                    .unwrap_or_default(),
                claims_unverified: lens.claims_unverified.clone(),
            }),
            stance: state.stance,
            blocked_actions: state
                .capabilities
                .as_ref()
                .map(|report| report.blocked().map(|decision| decision.action).collect())
                .unwrap_or_default(),
            generation: state.generation.as_ref().map(|generation| GenerationAudit {
                model: generation.model.clone(),
                provider_id: generation.provider_id.clone(),
                fallback_used: generation.fallback_used,
                tokens_used: generation.tokens_used,
            }),
            leak_guard: state.leak_guard.clone(),
            gate_trace: state.gate_records.clone(),
            regeneration_count: state.regeneration_count(),
            degraded: state.is_degraded(),
            stopped_at: state.stopped().map(|stop| stop.gate),
            stop_reason: state.stopped().map(|stop| stop.reason.clone()),
            pending_ack_hash: state
                .pending_ack
                .as_ref()
                .map(|pending| sha256_hex(&pending.ack_token)),
            ack_expires_at: state
                .pending_ack
                .as_ref()
                .map(|pending| pending.expires_at.clone()),
            invariant_results: invariant.results,
            critical_violations: invariant.critical_violations,
            non_critical_violations: invariant.non_critical_violations,
            crisis_resources_provided: state.crisis_resources_provided(),
            session_ended: state.session_ended(),
            policy_versions: self.policy_versions.clone(),
        };

        ResponseAudit::seal(content)
    }
}
