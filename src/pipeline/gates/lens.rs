use crate::{
    intent::IntentResult,
    lens::{Confidence, TieredLensResult, TieredVerifier},
    pipeline::gate::{GateAction, GateId, GateResult},
};

/// Retrieval trouble is recovered here as a confidence level; the gate never stops the turn.
pub async fn run_lens_gate(
    verifier: &TieredVerifier,
    message: &str,
    intent: &IntentResult,
) -> GateResult<TieredLensResult> {
    let result = verifier.verify(message, intent).await;
    match result.confidence {
        Confidence::Degraded | Confidence::Insufficient => {
            let reason = result
                .degradation_reason
                .map(|reason| reason.as_str())
                .unwrap_or(result.confidence.as_str())
                .to_string();
            GateResult::soft_fail(GateId::Lens, result, GateAction::Continue, reason)
        }
        _ => GateResult::pass(GateId::Lens, result),
    }
}
