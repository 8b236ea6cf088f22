use serde::{Deserialize, Serialize};

use crate::types::Stance;

pub const CAPABILITY_MATRIX_VERSION: &str = "capability-matrix/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Answer,
    WebSearch,
    CiteSources,
    GiveNumericEstimate,
    GiveRecommendation,
    ExecuteTask,
    SetReminder,
    SuggestFollowUp,
    ProvideCrisisResources,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Answer => "answer",
            Self::WebSearch => "web_search",
            Self::CiteSources => "cite_sources",
            Self::GiveNumericEstimate => "give_numeric_estimate",
            Self::GiveRecommendation => "give_recommendation",
            Self::ExecuteTask => "execute_task",
            Self::SetReminder => "set_reminder",
            Self::SuggestFollowUp => "suggest_follow_up",
            Self::ProvideCrisisResources => "provide_crisis_resources",
        }
    }
}

const CONTROL_ACTIONS: &[Action] = &[Action::Answer, Action::ProvideCrisisResources];

const SHIELD_ACTIONS: &[Action] = &[
    Action::Answer,
    Action::CiteSources,
    Action::SuggestFollowUp,
    Action::ProvideCrisisResources,
];

const LENS_ACTIONS: &[Action] = &[
    Action::Answer,
    Action::WebSearch,
    Action::CiteSources,
    Action::GiveNumericEstimate,
    Action::SuggestFollowUp,
];

const SWORD_ACTIONS: &[Action] = &[
    Action::Answer,
    Action::WebSearch,
    Action::CiteSources,
    Action::GiveNumericEstimate,
    Action::GiveRecommendation,
    Action::ExecuteTask,
    Action::SetReminder,
    Action::SuggestFollowUp,
];

/// Stances in the order a blocked action searches for the one that would permit it.
const ESCALATION_ORDER: [Stance; 4] = [Stance::Lens, Stance::Sword, Stance::Shield, Stance::Control];

pub fn allowed_actions(stance: Stance) -> &'static [Action] {
    match stance {
        Stance::Control => CONTROL_ACTIONS,
        Stance::Shield => SHIELD_ACTIONS,
        Stance::Lens => LENS_ACTIONS,
        Stance::Sword => SWORD_ACTIONS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDecision {
    pub action: Action,
    pub allowed: bool,
    pub reason: String,
    #[serde(default)]
    pub required_stance: Option<Stance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub stance: Stance,
    pub decisions: Vec<ActionDecision>,
}

impl CapabilityReport {
    pub fn allowed(&self) -> impl Iterator<Item = Action> + '_ {
        self.decisions
            .iter()
            .filter(|decision| decision.allowed)
            .map(|decision| decision.action)
    }

    pub fn blocked(&self) -> impl Iterator<Item = &ActionDecision> + '_ {
        self.decisions.iter().filter(|decision| !decision.allowed)
    }

    pub fn is_allowed(&self, action: Action) -> bool {
        self.decisions
            .iter()
            .any(|decision| decision.action == action && decision.allowed)
    }

    pub fn has_blocked(&self) -> bool {
        self.decisions.iter().any(|decision| !decision.allowed)
    }
}

/// Pure lookup over the static stance/action matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityChecker;

impl CapabilityChecker {
    pub fn check(&self, stance: Stance, requested: &[Action]) -> CapabilityReport {
        let mut seen = Vec::with_capacity(requested.len());
        let mut decisions = Vec::with_capacity(requested.len());

        for action in requested {
            if seen.contains(action) {
                continue;
            }
            seen.push(*action);

            if allowed_actions(stance).contains(action) {
                decisions.push(ActionDecision {
                    action: *action,
                    allowed: true,
                    reason: format!("permitted in {} stance", stance.as_str()),
                    required_stance: None,
                });
                continue;
            }

            let required_stance = ESCALATION_ORDER
                .into_iter()
                .find(|candidate| allowed_actions(*candidate).contains(action));
            let reason = match required_stance {
                Some(required) => format!(
                    "{} is not permitted in {} stance; requires {}",
                    action.as_str(),
                    stance.as_str(),
                    required.as_str()
                ),
                None => format!("{} is not permitted in any stance", action.as_str()),
            };
            decisions.push(ActionDecision {
                action: *action,
                allowed: false,
                reason,
                required_stance,
            });
        }

        CapabilityReport { stance, decisions }
    }
}
