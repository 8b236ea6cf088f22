use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    intent::ClassificationError,
    lens::classify::{LensAssistVerdict, LensClassifierAssist},
    provider::{GenerationConstraints, GenerationRequest, LlmProvider},
    types::Stance,
};

/// Asks a chat model for a JSON verdict on whether fresh evidence is needed.
pub struct LlmLensAssist {
    provider: Arc<dyn LlmProvider>,
}

impl LlmLensAssist {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl LensClassifierAssist for LlmLensAssist {
    async fn assess(&self, message: &str) -> Result<LensAssistVerdict, ClassificationError> {
        let request = GenerationRequest {
            request_id: format!("lens-assist-{}", Uuid::now_v7()),
            message: format!(
                "Decide whether answering the message below needs current information from the web.\n\
                 Reply with JSON only, shaped as {{\"web_helpful\": bool, \"risk_factors\": [..]}} where \
                 risk_factors uses post_cutoff_facts, specific_numbers, volatile_data, breaking_news.\n\n\
                 Message: {message}"
            ),
            history: Vec::new(),
            constraints: GenerationConstraints::for_stance(Stance::Lens),
            attempt: 0,
        };
        let generation = self
            .provider
            .generate(&request)
            .await
            .map_err(|err| ClassificationError::new(format!("lens assist provider: {err}")))?;
        parse_verdict(&generation.text)
    }
}

pub fn parse_verdict(text: &str) -> Result<LensAssistVerdict, ClassificationError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(ClassificationError::new("lens assist reply had no JSON object")),
    };
    serde_json::from_str(json)
        .map_err(|err| ClassificationError::new(format!("lens assist reply invalid: {err}")))
}
