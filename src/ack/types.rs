use serde::{Deserialize, Serialize};

use crate::types::AuditId;

pub type AckToken = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAck {
    pub ack_token: AckToken,
    pub required_text: String,
    pub expires_at_ms: i64,
    /// RFC 3339 form of `expires_at_ms`, for callers that render it.
    pub expires_at: String,
    pub audit_id: AuditId,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckValidationReason {
    Accepted,
    Expired,
    TextMismatch,
    NotFound,
    AlreadyConsumed,
}

impl AckValidationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::TextMismatch => "text_mismatch",
            Self::NotFound => "not_found",
            Self::AlreadyConsumed => "already_consumed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckValidation {
    pub accepted: bool,
    pub reason: AckValidationReason,
    /// Present on acceptance and mismatch; a mismatch leaves the token usable.
    #[serde(default)]
    pub pending: Option<PendingAck>,
}

impl AckValidation {
    pub fn rejected(reason: AckValidationReason) -> Self {
        Self {
            accepted: false,
            reason,
            pending: None,
        }
    }
}

/// Stored form of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AckRecord {
    pub required_text: String,
    pub expires_at_ms: i64,
    pub issued_at_ms: i64,
    pub audit_id: AuditId,
    pub reason: String,
}

fn default_key_prefix() -> String {
    "gatehouse:ack:".to_string()
}

fn default_grace_retention_seconds() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckStoreConfig {
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// How long records outlive their expiry so late submissions read as expired, not unknown.
    #[serde(default = "default_grace_retention_seconds")]
    pub grace_retention_seconds: u64,
}

impl Default for AckStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            grace_retention_seconds: default_grace_retention_seconds(),
        }
    }
}
