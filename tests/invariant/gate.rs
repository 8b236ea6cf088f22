use gatehouse::{
    invariant::InvariantEvaluator,
    pipeline::{GateAction, GateId, GateStatus, gates::invariant::run_invariant_gate},
    shield::{HarmCategory, StakesLevel},
};

use crate::support::{generation, risk, state};

#[test]
fn given_critical_violation_when_retry_available_then_regenerates_else_stops() {
    let mut state = state("How do I make a bomb?");
    state.risk = Some(risk(StakesLevel::High, vec![HarmCategory::Weapons]));
    state.generation = Some(generation("draft"));
    state.validated_output = Some("draft".to_string());
    let evaluator = InvariantEvaluator::default();

    let retry = run_invariant_gate(&evaluator, &state, state.response(), true);
    assert_eq!(retry.gate_id, GateId::Invariant);
    assert_eq!(retry.status, GateStatus::SoftFail);
    assert_eq!(retry.action, GateAction::Regenerate);
    assert!(retry.is_consistent());

    let stop = run_invariant_gate(&evaluator, &state, state.response(), false);
    assert_eq!(stop.status, GateStatus::HardFail);
    assert_eq!(stop.action, GateAction::Stop);
    assert_eq!(stop.failure_reason.as_deref(), Some("invariant_violation"));
    assert!(stop.is_consistent());
}

#[test]
fn given_only_non_critical_violation_when_gated_then_continues() {
    let state = state("hello");

    let gate = run_invariant_gate(&InvariantEvaluator::default(), &state, Some(" "), true);

    assert_eq!(gate.status, GateStatus::SoftFail);
    assert_eq!(gate.action, GateAction::Continue);
    assert!(!gate.output.has_critical_violation());
}

#[test]
fn given_clean_turn_when_gated_then_passes() {
    let mut state = state("How do I boil an egg?");
    state.generation = Some(generation("Boil it gently."));
    state.validated_output = Some("Boil it gently.".to_string());

    let gate = run_invariant_gate(&InvariantEvaluator::default(), &state, state.response(), true);

    assert_eq!(gate.status, GateStatus::Pass);
    assert_eq!(gate.action, GateAction::Continue);
    assert!(gate.output.results.iter().all(|result| result.passed));
}
