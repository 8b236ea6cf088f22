use serde::{Deserialize, Serialize};

use crate::{
    ack::PendingAck,
    capability::CapabilityReport,
    intent::IntentResult,
    invariant::InvariantGateOutput,
    lens::{LeakViolation, TieredLensResult},
    pipeline::{
        gate::{GateId, GateRecord},
        gates::spark::SparkSuggestion,
    },
    provider::{Generation, GenerationConstraints},
    shield::RiskSummary,
    types::{AuditId, PipelineInput, RequestId, Stance},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopInfo {
    pub gate: GateId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakGuardRun {
    pub required: bool,
    pub ran: bool,
    #[serde(default)]
    pub violations: Vec<LeakViolation>,
    pub substituted: bool,
}

/// Per-request state. Owned by exactly one in-flight turn.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub request_id: RequestId,
    pub audit_id: AuditId,
    pub started_at_ms: i64,
    pub input: PipelineInput,
    pub intent: Option<IntentResult>,
    pub risk: Option<RiskSummary>,
    pub lens: Option<TieredLensResult>,
    pub stance: Option<Stance>,
    pub capabilities: Option<CapabilityReport>,
    pub constraints: Option<GenerationConstraints>,
    pub generation: Option<Generation>,
    pub validated_output: Option<String>,
    pub spark: Option<SparkSuggestion>,
    pub leak_guard: Option<LeakGuardRun>,
    pub pending_ack: Option<PendingAck>,
    pub invariant: Option<InvariantGateOutput>,
    pub gate_records: Vec<GateRecord>,
    regeneration_count: u32,
    max_regenerations: u32,
    degraded: bool,
    stop: Option<StopInfo>,
    crisis_resources_provided: bool,
    session_ended: bool,
}

impl PipelineState {
    pub fn new(
        request_id: RequestId,
        audit_id: AuditId,
        started_at_ms: i64,
        input: PipelineInput,
        max_regenerations: u32,
    ) -> Self {
        Self {
            request_id,
            audit_id,
            started_at_ms,
            input,
            intent: None,
            risk: None,
            lens: None,
            stance: None,
            capabilities: None,
            constraints: None,
            generation: None,
            validated_output: None,
            spark: None,
            leak_guard: None,
            pending_ack: None,
            invariant: None,
            gate_records: Vec::new(),
            regeneration_count: 0,
            max_regenerations,
            degraded: false,
            stop: None,
            crisis_resources_provided: false,
            session_ended: false,
        }
    }

    pub fn regeneration_count(&self) -> u32 {
        self.regeneration_count
    }

    pub fn max_regenerations(&self) -> u32 {
        self.max_regenerations
    }

    pub fn regenerations_remaining(&self) -> bool {
        self.regeneration_count < self.max_regenerations
    }

    /// Consumes one unit of regeneration budget; `false` once the budget is spent.
    pub fn try_regenerate(&mut self) -> bool {
        if !self.regenerations_remaining() {
            return false;
        }
        self.regeneration_count += 1;
        true
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// One-way: there is no way back to not degraded.
    pub fn mark_degraded(&mut self) {
        self.degraded = true;
    }

    pub fn stopped(&self) -> Option<&StopInfo> {
        self.stop.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_some()
    }

    /// First stop wins; later calls are ignored and return `false`.
    pub fn stop(&mut self, gate: GateId, reason: impl Into<String>) -> bool {
        if self.stop.is_some() {
            return false;
        }
        self.stop = Some(StopInfo {
            gate,
            reason: reason.into(),
        });
        true
    }

    pub fn crisis_resources_provided(&self) -> bool {
        self.crisis_resources_provided
    }

    pub fn session_ended(&self) -> bool {
        self.session_ended
    }

    /// Only meaningful on the critical-stakes path; the flags are sticky.
    pub fn mark_crisis(&mut self, session_end: bool) {
        self.crisis_resources_provided = true;
        if session_end {
            self.session_ended = true;
        }
    }

    pub fn record(&mut self, record: GateRecord) {
        self.gate_records.push(record);
    }

    pub fn response(&self) -> Option<&str> {
        self.validated_output.as_deref()
    }
}
