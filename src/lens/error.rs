use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalErrorKind {
    Timeout,
    Unavailable,
    Authentication,
    RateLimited,
    ProtocolViolation,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalError {
    pub kind: RetrievalErrorKind,
    pub message: String,
    pub provider_id: Option<String>,
}

impl RetrievalError {
    pub fn new(kind: RetrievalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_id: None,
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider_id {
            Some(provider_id) => write!(f, "{} (provider={})", self.message, provider_id),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RetrievalError {}

pub fn retrieval_timeout(provider_id: &str, timeout_ms: u64) -> RetrievalError {
    RetrievalError::new(
        RetrievalErrorKind::Timeout,
        format!("evidence provider timed out after {timeout_ms}ms"),
    )
    .with_provider_id(provider_id)
}
