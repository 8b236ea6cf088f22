use serde::{Deserialize, Serialize};

use crate::{
    capability::{Action, CapabilityReport},
    intent::{IntentKind, IntentResult},
    pipeline::gate::{GateId, GateResult},
    types::Stance,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparkSuggestion {
    pub action: Action,
    pub text: String,
}

/// At most one suggestion, and only for an action the capability gate allowed.
pub fn suggest(
    enabled: bool,
    stance: Stance,
    intent: &IntentResult,
    capabilities: &CapabilityReport,
) -> Option<SparkSuggestion> {
    if !enabled || stance == Stance::Control {
        return None;
    }
    if intent.kind == IntentKind::Task && capabilities.is_allowed(Action::SetReminder) {
        return Some(SparkSuggestion {
            action: Action::SetReminder,
            text: "Want me to set a reminder so this doesn't slip?".to_string(),
        });
    }
    if capabilities.is_allowed(Action::SuggestFollowUp) {
        let text = match stance {
            Stance::Shield => "Would it help to talk through safer alternatives?",
            Stance::Lens => "Want me to dig into any part of this further?",
            Stance::Sword => "Want a checklist for the next step?",
            Stance::Control => return None,
        };
        return Some(SparkSuggestion {
            action: Action::SuggestFollowUp,
            text: text.to_string(),
        });
    }
    None
}

pub fn run_spark_gate(
    enabled: bool,
    stance: Stance,
    intent: &IntentResult,
    capabilities: &CapabilityReport,
) -> GateResult<Option<SparkSuggestion>> {
    GateResult::pass(GateId::Spark, suggest(enabled, stance, intent, capabilities))
}
