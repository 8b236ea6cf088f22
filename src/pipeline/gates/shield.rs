use crate::{
    pipeline::gate::{GateAction, GateId, GateResult},
    shield::{InterventionLevel, RiskAssessor, RiskSummary},
    types::{ConversationContext, Domain},
};

pub const CONTROL_TRIGGER: &str = "control_trigger";
pub const HARD_VETO: &str = "hard_veto";
pub const SOFT_VETO: &str = "soft_veto";

pub async fn run_shield_gate(
    assessor: &RiskAssessor,
    message: &str,
    context: &ConversationContext,
    domain: Domain,
) -> GateResult<RiskSummary> {
    let summary = assessor.assess(message, context, domain).await;
    tracing::info!(
        target: "shield",
        stakes = ?summary.stakes,
        intervention = ?summary.intervention,
        veto_type = ?summary.veto_type,
        control_trigger = summary.control_trigger,
        classification_failed = summary.classification_failed,
        "risk_assessed"
    );
    shield_verdict(summary)
}

/// Maps a risk summary onto the gate's control verdict.
pub fn shield_verdict(summary: RiskSummary) -> GateResult<RiskSummary> {
    // Control takes its own route through the sequencer; it is not a stop.
    if summary.control_trigger {
        return GateResult::soft_fail(GateId::Shield, summary, GateAction::Continue, CONTROL_TRIGGER);
    }
    if summary.is_hard_veto() {
        return GateResult::hard_fail(GateId::Shield, summary, GateAction::Stop, HARD_VETO);
    }
    if summary.awaiting_override() {
        return GateResult::hard_fail(GateId::Shield, summary, GateAction::AwaitAck, SOFT_VETO);
    }
    if summary.classification_failed {
        return GateResult::soft_fail(
            GateId::Shield,
            summary,
            GateAction::Continue,
            "classification_failed",
        );
    }
    if summary.intervention >= InterventionLevel::Friction {
        return GateResult::soft_fail(GateId::Shield, summary, GateAction::Continue, "friction");
    }
    GateResult::pass(GateId::Shield, summary)
}
