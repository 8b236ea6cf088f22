use serde::{Deserialize, Serialize};

use crate::shield::StakesLevel;

pub const INVARIANT_POLICY_VERSION: &str = "invariants/v1";

/// Checks the evaluator knows how to run. Registry entries pair one with an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantPredicate {
    NoUnlicensedNumbersWhenStakesAtLeast { stakes: StakesLevel },
    ControlStanceIncludesCrisisResources,
    SoftVetoRequiresAck,
    HardVetoWithholdsGeneration,
    ForceHighTierRespected,
    DegradedResponseQualified { markers: Vec<String> },
    LeakGuardRanWhenRequired,
    BlockedActionsNotRequired,
    RegenerationWithinBudget,
    ResponseNonEmpty,
    GateOrderRespected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantDefinition {
    pub id: String,
    pub description: String,
    pub predicate: InvariantPredicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantResult {
    pub id: String,
    pub critical: bool,
    pub passed: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantGateOutput {
    pub results: Vec<InvariantResult>,
    pub critical_violations: Vec<String>,
    pub non_critical_violations: Vec<String>,
}

impl InvariantGateOutput {
    pub fn has_critical_violation(&self) -> bool {
        !self.critical_violations.is_empty()
    }

    pub fn all_violations(&self) -> Vec<String> {
        self.critical_violations
            .iter()
            .chain(self.non_critical_violations.iter())
            .cloned()
            .collect()
    }
}
