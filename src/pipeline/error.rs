use thiserror::Error;

use crate::{ack::AckError, provider::ProviderError, types::AuditId};

/// System-fatal outcomes. Display stays generic; detail lives in the audit record and logs.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("the service is temporarily unavailable, please try again shortly")]
    StoreUnavailable {
        audit_id: AuditId,
        #[source]
        source: AckError,
    },
    #[error("the service is temporarily unavailable, please try again shortly")]
    ProvidersUnavailable {
        audit_id: AuditId,
        #[source]
        source: ProviderError,
    },
    #[error("the request was cancelled")]
    Cancelled { audit_id: AuditId },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ServiceError {
    pub fn audit_id(&self) -> Option<&str> {
        match self {
            Self::StoreUnavailable { audit_id, .. }
            | Self::ProvidersUnavailable { audit_id, .. }
            | Self::Cancelled { audit_id } => Some(audit_id),
            Self::Config(_) => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::ProvidersUnavailable { .. } => "providers_unavailable",
            Self::Cancelled { .. } => "cancelled",
            Self::Config(_) => "config_invalid",
        }
    }
}
