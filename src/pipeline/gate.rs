use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateId {
    Intent,
    Shield,
    Lens,
    Stance,
    Capability,
    Model,
    Personality,
    Spark,
    Invariant,
}

impl GateId {
    pub const ORDER: [GateId; 9] = [
        GateId::Intent,
        GateId::Shield,
        GateId::Lens,
        GateId::Stance,
        GateId::Capability,
        GateId::Model,
        GateId::Personality,
        GateId::Spark,
        GateId::Invariant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Shield => "shield",
            Self::Lens => "lens",
            Self::Stance => "stance",
            Self::Capability => "capability",
            Self::Model => "model",
            Self::Personality => "personality",
            Self::Spark => "spark",
            Self::Invariant => "invariant",
        }
    }

    pub fn position(self) -> usize {
        Self::ORDER
            .iter()
            .position(|gate| *gate == self)
            .unwrap_or(Self::ORDER.len())
    }

    /// Gates allowed to ask for another generation attempt on a pass.
    pub fn may_regenerate_on_pass(self) -> bool {
        matches!(self, Self::Model | Self::Personality)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pass,
    SoftFail,
    HardFail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    Continue,
    Regenerate,
    Stop,
    AwaitAck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult<T> {
    pub gate_id: GateId,
    pub status: GateStatus,
    pub output: T,
    pub action: GateAction,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub execution_time_ms: u64,
}

impl<T> GateResult<T> {
    pub fn pass(gate_id: GateId, output: T) -> Self {
        Self {
            gate_id,
            status: GateStatus::Pass,
            output,
            action: GateAction::Continue,
            failure_reason: None,
            execution_time_ms: 0,
        }
    }

    pub fn pass_with_regenerate(gate_id: GateId, output: T, reason: impl Into<String>) -> Self {
        Self {
            action: GateAction::Regenerate,
            failure_reason: Some(reason.into()),
            ..Self::pass(gate_id, output)
        }
    }

    pub fn soft_fail(
        gate_id: GateId,
        output: T,
        action: GateAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            gate_id,
            status: GateStatus::SoftFail,
            output,
            action,
            failure_reason: Some(reason.into()),
            execution_time_ms: 0,
        }
    }

    pub fn hard_fail(
        gate_id: GateId,
        output: T,
        action: GateAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            gate_id,
            status: GateStatus::HardFail,
            output,
            action,
            failure_reason: Some(reason.into()),
            execution_time_ms: 0,
        }
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.execution_time_ms = elapsed_ms;
        self
    }

    pub fn is_consistent(&self) -> bool {
        match self.status {
            GateStatus::HardFail => {
                matches!(self.action, GateAction::Stop | GateAction::AwaitAck)
            }
            GateStatus::Pass => {
                self.action == GateAction::Continue
                    || (self.action == GateAction::Regenerate
                        && self.gate_id.may_regenerate_on_pass())
            }
            GateStatus::SoftFail => true,
        }
    }

    pub fn record(&self, attempt: u32) -> GateRecord {
        GateRecord {
            gate_id: self.gate_id,
            status: self.status,
            action: self.action,
            failure_reason: self.failure_reason.clone(),
            execution_time_ms: self.execution_time_ms,
            attempt,
        }
    }
}

/// Output-free trace entry kept on the state for audit and debug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRecord {
    pub gate_id: GateId,
    pub status: GateStatus,
    pub action: GateAction,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub execution_time_ms: u64,
    /// Regeneration count when the gate ran.
    pub attempt: u32,
}
