use serde::{Deserialize, Serialize};

use crate::{
    lens::Confidence,
    pipeline::gate::{GateId, GateResult},
    shield::InterventionLevel,
    types::Stance,
};

pub const PERSONA_PHRASES: &str = "persona_phrases";

/// What the styler needs to know about the turn. Text is styled, never re-generated, here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalityContext {
    pub stance: Stance,
    pub intervention: InterventionLevel,
    pub override_applied: bool,
    pub confidence: Option<Confidence>,
    pub freshness_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyledText {
    pub text: String,
    /// Phrases found and removed; a non-empty list asks for another generation that avoids them.
    #[serde(default)]
    pub avoid_phrases: Vec<String>,
}

pub trait PersonalityPort: Send + Sync {
    fn style(&self, draft: &str, context: &PersonalityContext) -> StyledText;
}

fn default_forbidden_phrases() -> Vec<String> {
    vec![
        "as an ai language model".to_string(),
        "i'm just an ai".to_string(),
        "i am just an ai".to_string(),
        "great question!".to_string(),
        "i hope this helps!".to_string(),
    ]
}

/// Preamble for the intervention level. Must stay free of numerals.
fn preamble(context: &PersonalityContext) -> Option<&'static str> {
    if context.stance == Stance::Control {
        return None;
    }
    if context.override_applied {
        return Some(
            "You've confirmed you understand the risks, so here is the information with the key cautions up front.",
        );
    }
    match context.intervention {
        InterventionLevel::Friction | InterventionLevel::Veto => Some(
            "Please pause before acting on this. It carries real risk, and it's worth weighing carefully.",
        ),
        InterventionLevel::Nudge => Some("A quick note before we start: keep the risks in mind here."),
        InterventionLevel::None => None,
    }
}

const GENERIC_QUALIFICATION: &str =
    "I couldn't fully verify this, so please confirm it with a current, authoritative source.";

#[derive(Debug, Clone)]
pub struct PersonaStyler {
    forbidden_phrases: Vec<String>,
}

impl Default for PersonaStyler {
    fn default() -> Self {
        Self::new(default_forbidden_phrases())
    }
}

impl PersonaStyler {
    pub fn new(forbidden_phrases: Vec<String>) -> Self {
        Self {
            forbidden_phrases: forbidden_phrases
                .into_iter()
                .map(|phrase| phrase.to_lowercase())
                .filter(|phrase| !phrase.trim().is_empty())
                .collect(),
        }
    }

    fn strip_forbidden(&self, draft: &str) -> (String, Vec<String>) {
        let mut text = draft.to_string();
        let mut found = Vec::new();
        for phrase in &self.forbidden_phrases {
            while let Some(start) = text.to_lowercase().find(phrase.as_str()) {
                // Lowercasing can shift byte offsets for non-ASCII text; bail rather than split a char.
                let end = start + phrase.len();
                if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
                    break;
                }
                text.replace_range(start..end, "");
                if !found.contains(phrase) {
                    found.push(phrase.clone());
                }
            }
        }
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let trimmed = collapsed
            .trim_start_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .to_string();
        (trimmed, found)
    }
}

impl PersonalityPort for PersonaStyler {
    fn style(&self, draft: &str, context: &PersonalityContext) -> StyledText {
        let (body, avoid_phrases) = self.strip_forbidden(draft);
        let mut parts: Vec<String> = Vec::new();
        if let Some(preamble) = preamble(context) {
            if !body.starts_with(preamble) {
                parts.push(preamble.to_string());
            }
        }
        parts.push(body.clone());

        if context
            .confidence
            .is_some_and(|confidence| confidence.is_degraded_or_worse())
        {
            let qualification = context
                .freshness_warning
                .clone()
                .unwrap_or_else(|| GENERIC_QUALIFICATION.to_string());
            if !body.contains(&qualification) {
                parts.push(qualification);
            }
        }

        StyledText {
            text: parts
                .into_iter()
                .filter(|part| !part.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            avoid_phrases,
        }
    }
}

pub fn run_personality_gate(
    personality: &dyn PersonalityPort,
    draft: &str,
    context: &PersonalityContext,
) -> GateResult<StyledText> {
    let styled = personality.style(draft, context);
    if styled.avoid_phrases.is_empty() {
        GateResult::pass(GateId::Personality, styled)
    } else {
        GateResult::pass_with_regenerate(GateId::Personality, styled, PERSONA_PHRASES)
    }
}
