use crate::{
    invariant::{InvariantEvaluator, InvariantGateOutput},
    pipeline::{
        gate::{GateAction, GateId, GateResult},
        state::PipelineState,
    },
};

pub const INVARIANT_VIOLATION: &str = "invariant_violation";

/// A critical violation regenerates when the caller still has a forced retry to spend, else stops.
pub fn run_invariant_gate(
    evaluator: &InvariantEvaluator,
    state: &PipelineState,
    response: Option<&str>,
    can_regenerate: bool,
) -> GateResult<InvariantGateOutput> {
    let output = evaluator.evaluate(state, response);
    if output.has_critical_violation() {
        return if can_regenerate {
            GateResult::soft_fail(
                GateId::Invariant,
                output,
                GateAction::Regenerate,
                INVARIANT_VIOLATION,
            )
        } else {
            GateResult::hard_fail(GateId::Invariant, output, GateAction::Stop, INVARIANT_VIOLATION)
        };
    }
    if !output.non_critical_violations.is_empty() {
        return GateResult::soft_fail(
            GateId::Invariant,
            output,
            GateAction::Continue,
            "non_critical_violation",
        );
    }
    GateResult::pass(GateId::Invariant, output)
}
