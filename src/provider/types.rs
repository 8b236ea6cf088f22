use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    capability::Action,
    types::{ConversationTurn, RequestId, Stance},
};

pub type ProviderId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedCredential {
    pub auth_header: Option<String>,
    pub extra_headers: Vec<(String, String)>,
}

impl ResolvedCredential {
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderDialect {
    #[default]
    OpenaiCompatible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBackendConfig {
    pub id: ProviderId,
    #[serde(default)]
    pub dialect: ProviderDialect,
    pub endpoint: String,
    pub model: String,
    pub credential: CredentialRef,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    2_000
}

fn default_breaker_failure_threshold() -> u32 {
    5
}

fn default_breaker_open_ms() -> u64 {
    15_000
}

fn default_mock_fallback() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,
    #[serde(default = "default_breaker_open_ms")]
    pub breaker_open_ms: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            breaker_failure_threshold: default_breaker_failure_threshold(),
            breaker_open_ms: default_breaker_open_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub backends: Vec<ProviderBackendConfig>,
    #[serde(default = "default_mock_fallback")]
    pub mock_fallback: bool,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            backends: Vec::new(),
            mock_fallback: default_mock_fallback(),
            reliability: ReliabilityConfig::default(),
        }
    }
}

/// Constraints the generated text has to honor. Tightened on each regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    pub stance: Stance,
    #[serde(default)]
    pub forbid_numeric: bool,
    #[serde(default)]
    pub licensed_numbers: BTreeSet<String>,
    #[serde(default)]
    pub avoid_phrases: Vec<String>,
    #[serde(default)]
    pub require_qualification: bool,
    #[serde(default)]
    pub freshness_warning: Option<String>,
    #[serde(default)]
    pub must_include_actions: Vec<Action>,
    #[serde(default)]
    pub blocked_actions: Vec<Action>,
    #[serde(default)]
    pub caution_note: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl GenerationConstraints {
    pub fn for_stance(stance: Stance) -> Self {
        Self {
            stance,
            forbid_numeric: false,
            licensed_numbers: BTreeSet::new(),
            avoid_phrases: Vec::new(),
            require_qualification: false,
            freshness_warning: None,
            must_include_actions: Vec::new(),
            blocked_actions: Vec::new(),
            caution_note: None,
            citations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub request_id: RequestId,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    pub constraints: GenerationConstraints,
    #[serde(default)]
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub provider_id: ProviderId,
    pub model: String,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub fallback_used: bool,
}
