use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::audit::{
    error::{AuditError, serialization_error},
    types::ResponseAudit,
};

/// Durable destination for sealed audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit(&self, audit: &ResponseAudit) -> Result<(), AuditError>;
}

/// Writes each record as one structured event on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, audit: &ResponseAudit) -> Result<(), AuditError> {
        let record = serde_json::to_string(audit)
            .map_err(|err| serialization_error(format!("audit record encode failed: {err}")))?;
        tracing::info!(
            target: "audit",
            audit_id = audit.audit_id(),
            request_id = audit.request_id(),
            status = audit.status().as_str(),
            record_hash = audit.record_hash(),
            record = %record,
            "response_audit"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<ResponseAudit>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ResponseAudit> {
        self.records.lock().await.clone()
    }

    pub async fn find(&self, audit_id: &str) -> Option<ResponseAudit> {
        self.records
            .lock()
            .await
            .iter()
            .find(|audit| audit.audit_id() == audit_id)
            .cloned()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn emit(&self, audit: &ResponseAudit) -> Result<(), AuditError> {
        self.records.lock().await.push(audit.clone());
        Ok(())
    }
}
