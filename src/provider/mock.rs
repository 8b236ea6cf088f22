use async_trait::async_trait;

use crate::{
    capability::Action,
    provider::{
        error::ProviderError,
        ports::LlmProvider,
        types::{Generation, GenerationRequest},
    },
    types::Stance,
};

pub const MOCK_PROVIDER_ID: &str = "mock";

/// Deterministic offline generator. Never emits numerals, so it always passes the leak guard.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn compose(&self, request: &GenerationRequest) -> String {
        let constraints = &request.constraints;
        let mut parts: Vec<String> = Vec::new();

        if let Some(note) = &constraints.caution_note {
            parts.push(note.clone());
        }
        parts.push(
            match constraints.stance {
                Stance::Control => "I'm here with you, and I want you to be safe.",
                Stance::Shield => {
                    "Before anything else, this carries real risk, so let's look at the downsides carefully."
                }
                Stance::Lens => "Here's what I can tell you about that.",
                Stance::Sword => "Here's a direct way to approach it.",
            }
            .to_string(),
        );
        if constraints.require_qualification {
            parts.push(
                "I couldn't fully verify this, so please treat it as provisional.".to_string(),
            );
        }
        if let Some(warning) = &constraints.freshness_warning {
            parts.push(warning.clone());
        }
        if constraints
            .must_include_actions
            .contains(&Action::SuggestFollowUp)
        {
            parts.push("Would you like to go through any part of this in more detail?".to_string());
        }

        parts.join(" ")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn id(&self) -> &str {
        MOCK_PROVIDER_ID
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        Ok(Generation {
            text: self.compose(request),
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model: "mock-static".to_string(),
            tokens_used: None,
            fallback_used: false,
        })
    }
}
