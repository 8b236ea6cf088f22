use std::env;

use async_trait::async_trait;

use crate::provider::{
    error::{ProviderError, ProviderErrorKind, invalid_request},
    types::{CredentialRef, ResolvedCredential},
};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        owner_id: &str,
    ) -> Result<ResolvedCredential, ProviderError>;
}

#[derive(Default)]
pub struct EnvCredentialProvider;

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn resolve(
        &self,
        reference: &CredentialRef,
        owner_id: &str,
    ) -> Result<ResolvedCredential, ProviderError> {
        match reference {
            CredentialRef::Env { var } => {
                let token = env::var(var).map_err(|_| {
                    ProviderError::new(
                        ProviderErrorKind::Authentication,
                        format!("missing credential environment variable {var} for {owner_id}"),
                    )
                    .with_retryable(false)
                    .with_provider_id(owner_id)
                })?;
                Ok(ResolvedCredential {
                    auth_header: Some(format!("Bearer {token}")),
                    extra_headers: Vec::new(),
                })
            }
            CredentialRef::InlineToken { token } => {
                if token.trim().is_empty() {
                    return Err(invalid_request("inline credential token cannot be empty"));
                }
                Ok(ResolvedCredential {
                    auth_header: Some(format!("Bearer {token}")),
                    extra_headers: Vec::new(),
                })
            }
            CredentialRef::None => Ok(ResolvedCredential::none()),
        }
    }
}
