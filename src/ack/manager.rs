use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    ack::{
        error::{AckError, AckErrorKind, corrupt_record, invalid_request},
        store::KvStore,
        types::{AckRecord, AckStoreConfig, AckValidation, AckValidationReason, PendingAck},
    },
    clock::{Clock, format_rfc3339_ms},
};

const ISSUE_ATTEMPTS: usize = 3;

/// Issues and validates single-use soft-veto acknowledgment tokens.
pub struct AckTokenManager {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: AckStoreConfig,
}

impl AckTokenManager {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: AckStoreConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn token_key(&self, token: &str) -> String {
        format!("{}token:{}", self.config.key_prefix, token)
    }

    fn consumed_key(&self, token: &str) -> String {
        format!("{}consumed:{}", self.config.key_prefix, token)
    }

    fn payload_key(&self, token: &str) -> String {
        format!("{}payload:{}", self.config.key_prefix, token)
    }

    fn retention_seconds(&self, ttl: Duration) -> u64 {
        ttl.as_secs()
            .max(1)
            .saturating_add(self.config.grace_retention_seconds)
    }

    pub async fn issue(
        &self,
        reason: &str,
        required_text: &str,
        ttl: Duration,
        audit_id: &str,
    ) -> Result<PendingAck, AckError> {
        if required_text.trim().is_empty() {
            return Err(invalid_request("ack required text cannot be empty"));
        }
        if ttl.is_zero() {
            return Err(invalid_request("ack ttl must be positive"));
        }

        let issued_at_ms = self.clock.now_ms();
        let expires_at_ms = issued_at_ms.saturating_add(ttl.as_millis() as i64);
        let record = AckRecord {
            required_text: required_text.trim().to_string(),
            expires_at_ms,
            issued_at_ms,
            audit_id: audit_id.to_string(),
            reason: reason.to_string(),
        };
        let raw = serde_json::to_string(&record)
            .map_err(|err| corrupt_record(format!("ack record encode failed: {err}")))?;

        for _ in 0..ISSUE_ATTEMPTS {
            let token = generate_token();
            let stored = self
                .store
                .set_if_not_exists(
                    &self.token_key(&token),
                    raw.clone(),
                    Some(self.retention_seconds(ttl)),
                )
                .await?;
            if stored {
                tracing::info!(
                    target: "ack",
                    audit_id = audit_id,
                    expires_at_ms = expires_at_ms,
                    "ack_token_issued"
                );
                return Ok(pending_from(token, &record));
            }
        }

        Err(AckError::new(
            AckErrorKind::TokenCollision,
            "could not allocate a unique ack token",
        ))
    }

    /// Mismatched text leaves the token in place; expiry and acceptance destroy it.
    pub async fn validate(&self, token: &str, supplied_text: &str) -> Result<AckValidation, AckError> {
        let key = self.token_key(token);
        let Some(raw) = self.store.get(&key).await? else {
            let reason = if self.store.exists(&self.consumed_key(token)).await? {
                AckValidationReason::AlreadyConsumed
            } else {
                AckValidationReason::NotFound
            };
            tracing::info!(target: "ack", reason = reason.as_str(), "ack_rejected");
            return Ok(AckValidation::rejected(reason));
        };
        let record: AckRecord = serde_json::from_str(&raw)
            .map_err(|err| corrupt_record(format!("ack record decode failed: {err}")))?;

        if self.clock.now_ms() >= record.expires_at_ms {
            self.store.delete(&key).await?;
            tracing::info!(
                target: "ack",
                audit_id = %record.audit_id,
                reason = AckValidationReason::Expired.as_str(),
                "ack_rejected"
            );
            return Ok(AckValidation::rejected(AckValidationReason::Expired));
        }

        if supplied_text.trim() != record.required_text {
            tracing::info!(
                target: "ack",
                audit_id = %record.audit_id,
                reason = AckValidationReason::TextMismatch.as_str(),
                "ack_rejected"
            );
            return Ok(AckValidation {
                accepted: false,
                reason: AckValidationReason::TextMismatch,
                pending: Some(pending_from(token.to_string(), &record)),
            });
        }

        // Only the caller that wins the take may accept.
        if self.store.take(&key).await?.is_none() {
            return Ok(AckValidation::rejected(AckValidationReason::AlreadyConsumed));
        }
        self.store
            .set(
                &self.consumed_key(token),
                record.audit_id.clone(),
                Some(self.config.grace_retention_seconds.max(1)),
            )
            .await?;

        tracing::info!(target: "ack", audit_id = %record.audit_id, "ack_accepted");
        Ok(AckValidation {
            accepted: true,
            reason: AckValidationReason::Accepted,
            pending: Some(pending_from(token.to_string(), &record)),
        })
    }

    /// Parks caller state next to a token, kept for the token's full retention.
    pub async fn attach_payload(
        &self,
        token: &str,
        payload: String,
        ttl: Duration,
    ) -> Result<(), AckError> {
        self.store
            .set(
                &self.payload_key(token),
                payload,
                Some(self.retention_seconds(ttl)),
            )
            .await?;
        Ok(())
    }

    pub async fn load_payload(&self, token: &str) -> Result<Option<String>, AckError> {
        Ok(self.store.get(&self.payload_key(token)).await?)
    }

    pub async fn discard_payload(&self, token: &str) -> Result<(), AckError> {
        self.store.delete(&self.payload_key(token)).await?;
        Ok(())
    }
}

fn generate_token() -> String {
    format!(
        "ack_{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn pending_from(token: String, record: &AckRecord) -> PendingAck {
    PendingAck {
        ack_token: token,
        required_text: record.required_text.clone(),
        expires_at_ms: record.expires_at_ms,
        expires_at: format_rfc3339_ms(record.expires_at_ms),
        audit_id: record.audit_id.clone(),
        reason: record.reason.clone(),
    }
}
