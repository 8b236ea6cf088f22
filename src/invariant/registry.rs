use crate::{
    invariant::types::{InvariantDefinition, InvariantPredicate},
    shield::StakesLevel,
};

pub const NO_UNVERIFIED_NUMBERS_HIGH_STAKES: &str = "no_unverified_numbers_high_stakes";
pub const CONTROL_INCLUDES_CRISIS_RESOURCES: &str = "control_includes_crisis_resources";
pub const SOFT_VETO_REQUIRES_ACK: &str = "soft_veto_requires_ack";
pub const HARD_VETO_WITHHOLDS_GENERATION: &str = "hard_veto_withholds_generation";
pub const FORCE_HIGH_TIER_RESPECTED: &str = "force_high_tier_respected";
pub const DEGRADED_RESPONSE_QUALIFIED: &str = "degraded_response_qualified";
pub const LEAK_GUARD_RAN_WHEN_REQUIRED: &str = "leak_guard_ran_when_required";
pub const BLOCKED_ACTIONS_NOT_REQUIRED: &str = "blocked_actions_not_required";
pub const REGENERATION_WITHIN_BUDGET: &str = "regeneration_within_budget";
pub const RESPONSE_NON_EMPTY: &str = "response_non_empty";
pub const GATE_ORDER_RESPECTED: &str = "gate_order_respected";

/// Violations of these change control flow; everything else is recorded only.
pub const CRITICAL_INVARIANTS: [&str; 7] = [
    NO_UNVERIFIED_NUMBERS_HIGH_STAKES,
    CONTROL_INCLUDES_CRISIS_RESOURCES,
    SOFT_VETO_REQUIRES_ACK,
    HARD_VETO_WITHHOLDS_GENERATION,
    FORCE_HIGH_TIER_RESPECTED,
    LEAK_GUARD_RAN_WHEN_REQUIRED,
    REGENERATION_WITHIN_BUDGET,
];

pub fn is_critical(id: &str) -> bool {
    CRITICAL_INVARIANTS.contains(&id)
}

fn definition(id: &str, description: &str, predicate: InvariantPredicate) -> InvariantDefinition {
    InvariantDefinition {
        id: id.to_string(),
        description: description.to_string(),
        predicate,
    }
}

pub fn default_registry() -> Vec<InvariantDefinition> {
    vec![
        definition(
            NO_UNVERIFIED_NUMBERS_HIGH_STAKES,
            "never output unverified specific numbers when stakes or verification tier is high",
            InvariantPredicate::NoUnlicensedNumbersWhenStakesAtLeast {
                stakes: StakesLevel::High,
            },
        ),
        definition(
            CONTROL_INCLUDES_CRISIS_RESOURCES,
            "control stance always includes crisis resources",
            InvariantPredicate::ControlStanceIncludesCrisisResources,
        ),
        definition(
            SOFT_VETO_REQUIRES_ACK,
            "soft veto never bypassed without a matching ack",
            InvariantPredicate::SoftVetoRequiresAck,
        ),
        definition(
            HARD_VETO_WITHHOLDS_GENERATION,
            "hard veto never reaches generation",
            InvariantPredicate::HardVetoWithholdsGeneration,
        ),
        definition(
            FORCE_HIGH_TIER_RESPECTED,
            "regulated domains are always verified at the high tier",
            InvariantPredicate::ForceHighTierRespected,
        ),
        definition(
            DEGRADED_RESPONSE_QUALIFIED,
            "degraded or insufficient verification is disclosed in the response",
            InvariantPredicate::DegradedResponseQualified {
                markers: vec![
                    "verify".to_string(),
                    "out of date".to_string(),
                    "confirm".to_string(),
                    "caution".to_string(),
                    "provisional".to_string(),
                    "incomplete".to_string(),
                ],
            },
        ),
        definition(
            LEAK_GUARD_RAN_WHEN_REQUIRED,
            "the leak guard ran whenever the lens required it",
            InvariantPredicate::LeakGuardRanWhenRequired,
        ),
        definition(
            BLOCKED_ACTIONS_NOT_REQUIRED,
            "generation is never asked to perform a blocked action",
            InvariantPredicate::BlockedActionsNotRequired,
        ),
        definition(
            REGENERATION_WITHIN_BUDGET,
            "regeneration count stays within the configured budget",
            InvariantPredicate::RegenerationWithinBudget,
        ),
        definition(
            RESPONSE_NON_EMPTY,
            "a released response is never blank",
            InvariantPredicate::ResponseNonEmpty,
        ),
        definition(
            GATE_ORDER_RESPECTED,
            "gates ran in the declared order, apart from regeneration loops",
            InvariantPredicate::GateOrderRespected,
        ),
    ]
}
