use crate::{
    intent::{IntentKind, IntentResult},
    pipeline::gate::{GateId, GateResult},
    shield::{InterventionLevel, RiskSummary, StakesLevel},
    types::Stance,
};

pub fn select_stance(risk: &RiskSummary, intent: &IntentResult) -> Stance {
    if risk.control_trigger {
        return Stance::Control;
    }
    if risk.intervention >= InterventionLevel::Friction
        || risk.override_applied
        || risk.stakes >= StakesLevel::High
    {
        return Stance::Shield;
    }
    if intent.kind == IntentKind::Task {
        return Stance::Sword;
    }
    Stance::Lens
}

pub fn run_stance_gate(risk: &RiskSummary, intent: &IntentResult) -> GateResult<Stance> {
    GateResult::pass(GateId::Stance, select_stance(risk, intent))
}
