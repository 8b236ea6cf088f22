use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::types::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    InvalidRequest,
    Authentication,
    Authorization,
    RateLimited,
    Timeout,
    CircuitOpen,
    BackendTransient,
    BackendPermanent,
    ProtocolViolation,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub provider_id: Option<ProviderId>,
    pub http_status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                ProviderErrorKind::RateLimited
                    | ProviderErrorKind::Timeout
                    | ProviderErrorKind::BackendTransient
            ),
            provider_id: None,
            http_status: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.provider_id, self.http_status) {
            (Some(provider_id), Some(status)) => {
                write!(f, "{} (provider={}, status={})", self.message, provider_id, status)
            }
            (Some(provider_id), None) => write!(f, "{} (provider={})", self.message, provider_id),
            (None, Some(status)) => write!(f, "{} (status={})", self.message, status),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

pub fn invalid_request(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::InvalidRequest, message).with_retryable(false)
}

pub fn unavailable(message: impl Into<String>) -> ProviderError {
    ProviderError::new(ProviderErrorKind::Unavailable, message).with_retryable(false)
}

pub fn map_http_error(status: u16, provider_id: &str, body: &str) -> ProviderError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = match status {
        401 => ProviderError::new(ProviderErrorKind::Authentication, "authentication failed")
            .with_retryable(false),
        403 => ProviderError::new(ProviderErrorKind::Authorization, "authorization failed")
            .with_retryable(false),
        408 | 429 => ProviderError::new(
            ProviderErrorKind::RateLimited,
            format!("provider returned status {status}"),
        ),
        400..=499 => ProviderError::new(
            ProviderErrorKind::InvalidRequest,
            format!("provider returned status {status}"),
        )
        .with_retryable(false),
        _ => ProviderError::new(
            ProviderErrorKind::BackendTransient,
            format!("provider returned status {status}"),
        ),
    };

    err = err.with_provider_id(provider_id).with_http_status(status);
    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }
    err
}
