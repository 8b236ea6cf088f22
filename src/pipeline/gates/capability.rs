use crate::{
    capability::{Action, CapabilityChecker, CapabilityReport},
    intent::{IntentKind, IntentResult},
    lens::{TieredLensResult, VerificationMode},
    pipeline::gate::{GateAction, GateId, GateResult},
    provider::GenerationConstraints,
    types::Stance,
};

/// Actions this turn may end up using: what the user asked for plus what the pipeline itself would do.
pub fn requested_actions(
    intent: &IntentResult,
    lens: &TieredLensResult,
    spark_enabled: bool,
) -> Vec<Action> {
    let mut actions = intent.requested_actions.clone();
    if lens.mode != VerificationMode::Skipped {
        actions.push(Action::WebSearch);
    }
    if !lens.constraints.citations.is_empty() {
        actions.push(Action::CiteSources);
    }
    if spark_enabled {
        actions.push(Action::SuggestFollowUp);
        if intent.kind == IntentKind::Task {
            actions.push(Action::SetReminder);
        }
    }
    actions
}

pub fn run_capability_gate(
    checker: &CapabilityChecker,
    stance: Stance,
    intent: &IntentResult,
    lens: &TieredLensResult,
    spark_enabled: bool,
) -> GateResult<CapabilityReport> {
    let report = checker.check(stance, &requested_actions(intent, lens, spark_enabled));
    let user_request_blocked = report
        .blocked()
        .any(|decision| intent.requested_actions.contains(&decision.action));
    if user_request_blocked {
        GateResult::soft_fail(
            GateId::Capability,
            report,
            GateAction::Continue,
            "requested_action_blocked",
        )
    } else {
        GateResult::pass(GateId::Capability, report)
    }
}

/// Generation constraints for the first attempt. Blocked actions never appear as required.
pub fn build_constraints(
    stance: Stance,
    lens: &TieredLensResult,
    report: &CapabilityReport,
) -> GenerationConstraints {
    let mut constraints = GenerationConstraints::for_stance(stance);
    let blocked: Vec<Action> = report.blocked().map(|decision| decision.action).collect();

    constraints.forbid_numeric = !lens.constraints.numeric_precision_allowed
        || blocked.contains(&Action::GiveNumericEstimate);
    constraints.licensed_numbers = lens.constraints.licensed_numbers.clone();
    constraints.require_qualification = lens.constraints.require_qualification;
    constraints.freshness_warning = lens.constraints.freshness_warning.clone();
    if report.is_allowed(Action::CiteSources) {
        constraints.citations = lens.constraints.citations.clone();
        if !constraints.citations.is_empty() {
            constraints.must_include_actions.push(Action::CiteSources);
        }
    }
    if blocked
        .iter()
        .any(|action| matches!(action, Action::ExecuteTask | Action::SetReminder))
    {
        constraints.caution_note = Some(
            "I can't take that action from here, but I can walk you through doing it yourself."
                .to_string(),
        );
    }
    constraints.blocked_actions = blocked;
    constraints
}
