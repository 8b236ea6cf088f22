use crate::{
    lens::{LeakGuard, LensConstraints, safe_template},
    pipeline::{
        gate::{GateAction, GateId, GateResult},
        state::LeakGuardRun,
    },
    provider::{FallbackGenerator, Generation, GenerationConstraints, GenerationRequest, ProviderError},
};

pub const LEAK_DETECTED: &str = "leak_detected";
pub const EMPTY_GENERATION: &str = "empty_generation";
pub const PROVIDER_UNAVAILABLE: &str = "provider_unavailable";

#[derive(Debug, Clone)]
pub struct ModelDraft {
    pub generation: Generation,
    /// Best text available from this attempt: the generation, or the safe template when it was rejected.
    pub text: String,
    pub leak_guard: LeakGuardRun,
    /// Constraints for the next attempt, when this one asked for regeneration.
    pub tightened: Option<GenerationConstraints>,
}

#[derive(Debug, Clone)]
pub enum ModelOutcome {
    Drafted(ModelDraft),
    Unavailable(ProviderError),
}

pub struct ModelGateInput<'a> {
    pub request: &'a GenerationRequest,
    pub lens_constraints: &'a LensConstraints,
    pub high_stakes: bool,
    pub user_message: &'a str,
}

/// The leak guard runs whenever the lens asks for it, stakes are high, or numbers are forbidden.
pub fn leak_guard_required(input: &ModelGateInput<'_>) -> bool {
    input.lens_constraints.leak_guard_required
        || input.high_stakes
        || input.request.constraints.forbid_numeric
}

/// The lens constraints, narrowed by anything a previous attempt tightened.
pub fn effective_constraints(
    lens_constraints: &LensConstraints,
    generation: &GenerationConstraints,
) -> LensConstraints {
    let mut effective = lens_constraints.clone();
    if generation.forbid_numeric {
        effective.numeric_precision_allowed = false;
    }
    effective
}

pub async fn run_model_gate(
    generator: &FallbackGenerator,
    input: ModelGateInput<'_>,
) -> GateResult<ModelOutcome> {
    let generation = match generator.generate(input.request).await {
        Ok(generation) => generation,
        Err(err) => {
            tracing::error!(
                target: "pipeline",
                request_id = %input.request.request_id,
                error = %err,
                "all_generation_providers_failed"
            );
            return GateResult::hard_fail(
                GateId::Model,
                ModelOutcome::Unavailable(err),
                GateAction::Stop,
                PROVIDER_UNAVAILABLE,
            );
        }
    };

    let effective = effective_constraints(input.lens_constraints, &input.request.constraints);
    let required = leak_guard_required(&input);
    let mut leak_guard = LeakGuardRun {
        required,
        ..LeakGuardRun::default()
    };

    if generation.text.trim().is_empty() {
        let draft = ModelDraft {
            text: safe_template(&effective),
            generation,
            leak_guard,
            tightened: Some(input.request.constraints.clone()),
        };
        return GateResult::pass_with_regenerate(
            GateId::Model,
            ModelOutcome::Drafted(draft),
            EMPTY_GENERATION,
        );
    }

    if required {
        let report = LeakGuard.check(&generation.text, &effective, input.user_message);
        leak_guard.ran = true;
        if !report.is_clean() {
            tracing::warn!(
                target: "lens",
                request_id = %input.request.request_id,
                violations = report.violations.len(),
                provider_id = %generation.provider_id,
                "leak_guard_rejected_generation"
            );
            leak_guard.violations = report.violations;
            leak_guard.substituted = true;

            let mut tightened = input.request.constraints.clone();
            tightened.forbid_numeric = true;
            tightened.require_qualification = true;
            if tightened.freshness_warning.is_none() {
                tightened.freshness_warning = effective.freshness_warning.clone();
            }
            let draft = ModelDraft {
                text: safe_template(&effective),
                generation,
                leak_guard,
                tightened: Some(tightened),
            };
            return GateResult::soft_fail(
                GateId::Model,
                ModelOutcome::Drafted(draft),
                GateAction::Regenerate,
                LEAK_DETECTED,
            );
        }
    }

    let draft = ModelDraft {
        text: generation.text.clone(),
        generation,
        leak_guard,
        tightened: None,
    };
    GateResult::pass(GateId::Model, ModelOutcome::Drafted(draft))
}
