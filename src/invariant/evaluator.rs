use crate::{
    invariant::{
        registry::{default_registry, is_critical},
        types::{InvariantDefinition, InvariantGateOutput, InvariantPredicate, InvariantResult},
    },
    lens::{LeakGuard, LeakKind, VerificationTier},
    pipeline::{gate::GateId, state::PipelineState},
    types::Stance,
};

/// Runs every registered invariant against a finished turn. Never short-circuits.
pub struct InvariantEvaluator {
    registry: Vec<InvariantDefinition>,
}

impl Default for InvariantEvaluator {
    fn default() -> Self {
        Self::new(default_registry())
    }
}

impl InvariantEvaluator {
    pub fn new(registry: Vec<InvariantDefinition>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &[InvariantDefinition] {
        &self.registry
    }

    pub fn evaluate(&self, state: &PipelineState, response: Option<&str>) -> InvariantGateOutput {
        let mut output = InvariantGateOutput::default();
        for definition in &self.registry {
            let critical = is_critical(&definition.id);
            let verdict = check(&definition.predicate, state, response);
            if let Err(detail) = &verdict {
                if critical {
                    output.critical_violations.push(definition.id.clone());
                } else {
                    output.non_critical_violations.push(definition.id.clone());
                }
                tracing::warn!(
                    target: "pipeline",
                    request_id = %state.request_id,
                    invariant = %definition.id,
                    critical = critical,
                    detail = %detail,
                    "invariant_violated"
                );
            }
            output.results.push(InvariantResult {
                id: definition.id.clone(),
                critical,
                passed: verdict.is_ok(),
                detail: verdict.err(),
            });
        }
        output
    }
}

fn check(
    predicate: &InvariantPredicate,
    state: &PipelineState,
    response: Option<&str>,
) -> Result<(), String> {
    match predicate {
        InvariantPredicate::NoUnlicensedNumbersWhenStakesAtLeast { stakes } => {
            let (Some(lens), Some(text)) = (&state.lens, response) else {
                return Ok(());
            };
            let high_stakes = state
                .risk
                .as_ref()
                .is_some_and(|risk| risk.stakes >= *stakes);
            if !high_stakes && lens.tier != VerificationTier::High {
                return Ok(());
            }
            let report = LeakGuard.check(text, &lens.constraints, &state.input.message);
            let unlicensed: Vec<&str> = report
                .violations
                .iter()
                .filter(|violation| violation.kind == LeakKind::UnlicensedNumber)
                .map(|violation| violation.token.as_str())
                .collect();
            if unlicensed.is_empty() {
                Ok(())
            } else {
                Err(format!("unlicensed figures released: {}", unlicensed.join(", ")))
            }
        }
        InvariantPredicate::ControlStanceIncludesCrisisResources => {
            if state.stance != Some(Stance::Control) {
                return Ok(());
            }
            let resources = state
                .risk
                .as_ref()
                .map(|risk| risk.crisis_resources.as_slice())
                .unwrap_or_default();
            let text = response.unwrap_or_default();
            if !state.crisis_resources_provided() || resources.is_empty() {
                return Err("control stance without crisis resources".to_string());
            }
            match resources
                .iter()
                .find(|resource| !text.contains(&resource.contact))
            {
                Some(missing) => Err(format!("crisis resource '{}' missing from response", missing.name)),
                None => Ok(()),
            }
        }
        InvariantPredicate::SoftVetoRequiresAck => {
            let Some(risk) = &state.risk else {
                return Ok(());
            };
            if !risk.is_soft_veto() || state.generation.is_none() {
                return Ok(());
            }
            if risk.override_applied && risk.override_audit_id.is_some() {
                Ok(())
            } else {
                Err("soft-vetoed response generated without an accepted ack".to_string())
            }
        }
        InvariantPredicate::HardVetoWithholdsGeneration => {
            let hard_veto = state.risk.as_ref().is_some_and(|risk| risk.is_hard_veto());
            if hard_veto && state.generation.is_some() {
                Err("generation ran after a hard veto".to_string())
            } else {
                Ok(())
            }
        }
        InvariantPredicate::ForceHighTierRespected => {
            let regulated = state
                .intent
                .as_ref()
                .is_some_and(|intent| intent.domain.is_force_high());
            match &state.lens {
                Some(lens) if (lens.force_high || regulated) && lens.tier != VerificationTier::High => {
                    Err(format!("force-high request verified at {:?} tier", lens.tier))
                }
                _ => Ok(()),
            }
        }
        InvariantPredicate::DegradedResponseQualified { markers } => {
            let (Some(lens), Some(text)) = (&state.lens, response) else {
                return Ok(());
            };
            if !lens.confidence.is_degraded_or_worse() {
                return Ok(());
            }
            let lower = text.to_lowercase();
            let warning_present = lens
                .constraints
                .freshness_warning
                .as_deref()
                .is_some_and(|warning| text.contains(warning));
            if warning_present || markers.iter().any(|marker| lower.contains(marker.as_str())) {
                Ok(())
            } else {
                Err("degraded verification not disclosed".to_string())
            }
        }
        InvariantPredicate::LeakGuardRanWhenRequired => {
            let required = state
                .lens
                .as_ref()
                .is_some_and(|lens| lens.constraints.leak_guard_required);
            if !required || state.generation.is_none() {
                return Ok(());
            }
            if state.leak_guard.as_ref().is_some_and(|run| run.ran) {
                Ok(())
            } else {
                Err("leak guard required but did not run".to_string())
            }
        }
        InvariantPredicate::BlockedActionsNotRequired => {
            let Some(constraints) = &state.constraints else {
                return Ok(());
            };
            match constraints
                .must_include_actions
                .iter()
                .find(|action| constraints.blocked_actions.contains(action))
            {
                Some(action) => Err(format!("blocked action '{}' was required", action.as_str())),
                None => Ok(()),
            }
        }
        InvariantPredicate::RegenerationWithinBudget => {
            if state.regeneration_count() <= state.max_regenerations() {
                Ok(())
            } else {
                Err(format!(
                    "{} regenerations exceed budget {}",
                    state.regeneration_count(),
                    state.max_regenerations()
                ))
            }
        }
        InvariantPredicate::ResponseNonEmpty => match response {
            Some(text) if text.trim().is_empty() => Err("response is blank".to_string()),
            _ => Ok(()),
        },
        InvariantPredicate::GateOrderRespected => {
            let out_of_order = state.gate_records.windows(2).find(|pair| {
                let (previous, next) = (pair[0].gate_id, pair[1].gate_id);
                next.position() < previous.position() && next != GateId::Model
            });
            match out_of_order {
                Some(pair) => Err(format!(
                    "{} ran after {}",
                    pair[1].gate_id.as_str(),
                    pair[0].gate_id.as_str()
                )),
                None => Ok(()),
            }
        }
    }
}

