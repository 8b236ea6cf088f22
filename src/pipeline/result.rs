use serde::{Deserialize, Serialize};

use crate::{
    ack::{AckValidationReason, PendingAck},
    lens::{Confidence, VerificationTier},
    pipeline::{
        gate::{GateId, GateRecord},
        gates::spark::SparkSuggestion,
    },
    provider::GenerationConstraints,
    shield::{CrisisResource, InterventionLevel, StakesLevel},
    types::{AuditId, RequestId, Stance},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    Stopped,
    AwaitingAck,
}

impl PipelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Stopped => "stopped",
            Self::AwaitingAck => "awaiting_ack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transparency {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    pub fallback_used: bool,
    pub verification_status: String,
    pub regeneration_count: u32,
    pub degraded: bool,
    #[serde(default)]
    pub violations: Vec<String>,
    pub override_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    pub gates: Vec<GateRecord>,
    #[serde(default)]
    pub stakes: Option<StakesLevel>,
    #[serde(default)]
    pub intervention: Option<InterventionLevel>,
    #[serde(default)]
    pub risk_score: Option<u8>,
    #[serde(default)]
    pub tier: Option<VerificationTier>,
    #[serde(default)]
    pub constraints: Option<GenerationConstraints>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub request_id: RequestId,
    pub audit_id: AuditId,
    pub status: PipelineStatus,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub stance: Option<Stance>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    pub verified: bool,
    #[serde(default)]
    pub freshness_warning: Option<String>,
    #[serde(default)]
    pub spark: Option<SparkSuggestion>,
    #[serde(default)]
    pub pending_ack: Option<PendingAck>,
    #[serde(default)]
    pub ack_rejection: Option<AckValidationReason>,
    #[serde(default)]
    pub stopped_at: Option<GateId>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub crisis_resources: Vec<CrisisResource>,
    pub session_ended: bool,
    pub transparency: Transparency,
    #[serde(default)]
    pub debug: Option<DebugTrace>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }

    pub fn is_stopped(&self) -> bool {
        self.status == PipelineStatus::Stopped
    }

    pub fn is_awaiting_ack(&self) -> bool {
        self.status == PipelineStatus::AwaitingAck
    }
}
