use crate::{
    intent::{IntentClassifier, IntentResult},
    pipeline::gate::{GateAction, GateId, GateResult},
    types::PipelineInput,
};

/// Classifier failure is not an error here: the turn continues on the conservative intent.
pub async fn run_intent_gate(
    classifier: &dyn IntentClassifier,
    input: &PipelineInput,
) -> GateResult<IntentResult> {
    match classifier.classify(&input.message, &input.context).await {
        Ok(intent) => GateResult::pass(GateId::Intent, intent),
        Err(err) => {
            tracing::warn!(
                target: "pipeline",
                error = %err,
                "intent_classification_failed_closed"
            );
            GateResult::soft_fail(
                GateId::Intent,
                IntentResult::conservative(),
                GateAction::Continue,
                "classification_failed",
            )
        }
    }
}
