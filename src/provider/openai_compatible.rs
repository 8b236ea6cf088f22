use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::{
    provider::{
        credentials::CredentialProvider,
        error::{ProviderError, ProviderErrorKind, map_http_error},
        ports::LlmProvider,
        prompt::render_system_prompt,
        types::{Generation, GenerationRequest, ProviderBackendConfig},
    },
    types::TurnRole,
};

/// Chat-completions backend speaking the OpenAI wire format.
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: ProviderBackendConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: ProviderBackendConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client must build"),
            config,
            credentials,
        }
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": render_system_prompt(&request.constraints),
        })];
        for turn in &request.history {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": turn.text}));
        }
        messages.push(json!({"role": "user", "content": request.message}));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
        });
        if let Some(max_tokens) = self.config.max_output_tokens {
            body["max_tokens"] = Value::Number(max_tokens.into());
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn id(&self) -> &str {
        &self.config.id
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let credential = self
            .credentials
            .resolve(&self.config.credential, &self.config.id)
            .await?;
        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let mut builder = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", request.request_id.as_str())
            .json(&self.request_body(request));
        if let Some(auth_header) = credential.auth_header {
            builder = builder.header(header::AUTHORIZATION, auth_header);
        }
        for (key, value) in credential.extra_headers {
            builder = builder.header(key, value);
        }

        let response = builder.send().await.map_err(|err| {
            let kind = if err.is_timeout() {
                ProviderErrorKind::Timeout
            } else {
                ProviderErrorKind::BackendTransient
            };
            ProviderError::new(kind, format!("openai-compatible request failed: {err}"))
                .with_provider_id(self.config.id.clone())
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &self.config.id, &body));
        }

        let payload = response.json::<Value>().await.map_err(|err| {
            ProviderError::new(
                ProviderErrorKind::ProtocolViolation,
                format!("openai-compatible body decode failed: {err}"),
            )
            .with_retryable(false)
            .with_provider_id(self.config.id.clone())
        })?;

        parse_completion(&payload, &self.config.id, &self.config.model)
    }
}

pub fn parse_completion(
    payload: &Value,
    provider_id: &str,
    fallback_model: &str,
) -> Result<Generation, ProviderError> {
    let text = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::ProtocolViolation,
                "openai-compatible response missing choices[0].message.content",
            )
            .with_retryable(false)
            .with_provider_id(provider_id)
        })?;

    Ok(Generation {
        text: text.to_string(),
        provider_id: provider_id.to_string(),
        model: payload
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(fallback_model)
            .to_string(),
        tokens_used: payload
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(Value::as_u64),
        fallback_used: false,
    })
}
