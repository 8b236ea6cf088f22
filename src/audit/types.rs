use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    audit::error::{AuditError, serialization_error},
    capability::{Action, CAPABILITY_MATRIX_VERSION},
    intent::IntentKind,
    invariant::{INVARIANT_POLICY_VERSION, InvariantResult},
    lens::{
        Confidence, DegradationReason, LENS_POLICY_VERSION, RetrievalOutcome, VerificationMode,
        VerificationTier,
    },
    pipeline::{
        gate::{GateId, GateRecord},
        result::PipelineStatus,
        state::LeakGuardRun,
    },
    shield::{HarmCategory, InterventionLevel, SHIELD_POLICY_VERSION, StakesLevel, VetoType},
    types::{AuditId, Domain, RequestId, SessionId, Stance},
};

fn default_shield_version() -> String {
    SHIELD_POLICY_VERSION.to_string()
}

fn default_lens_version() -> String {
    LENS_POLICY_VERSION.to_string()
}

fn default_invariants_version() -> String {
    INVARIANT_POLICY_VERSION.to_string()
}

fn default_capabilities_version() -> String {
    CAPABILITY_MATRIX_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVersions {
    #[serde(default = "default_shield_version")]
    pub shield: String,
    #[serde(default = "default_lens_version")]
    pub lens: String,
    #[serde(default = "default_invariants_version")]
    pub invariants: String,
    #[serde(default = "default_capabilities_version")]
    pub capabilities: String,
}

impl Default for PolicyVersions {
    fn default() -> Self {
        Self {
            shield: default_shield_version(),
            lens: default_lens_version(),
            invariants: default_invariants_version(),
            capabilities: default_capabilities_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentAudit {
    pub kind: IntentKind,
    pub domain: Domain,
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldAudit {
    pub stakes: StakesLevel,
    pub intervention: InterventionLevel,
    #[serde(default)]
    pub veto_type: Option<VetoType>,
    pub control_trigger: bool,
    #[serde(default)]
    pub categories: Vec<HarmCategory>,
    pub classification_failed: bool,
    pub override_applied: bool,
    #[serde(default)]
    pub override_audit_id: Option<AuditId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensAudit {
    pub tier: VerificationTier,
    pub mode: VerificationMode,
    pub risk_score: u8,
    pub force_high: bool,
    pub confidence: Confidence,
    #[serde(default)]
    pub retrieval: Option<RetrievalOutcome>,
    #[serde(default)]
    pub requirements_met: Option<bool>,
    #[serde(default)]
    pub degradation_reason: Option<DegradationReason>,
    #[serde(default)]
    pub evidence_urls: Vec<String>,
    #[serde(default)]
    pub claims_unverified: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationAudit {
    pub model: String,
    pub provider_id: String,
    pub fallback_used: bool,
    #[serde(default)]
    pub tokens_used: Option<u64>,
}

/// Everything the record hash covers. User text appears only as hashes and lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContent {
    pub audit_id: AuditId,
    pub request_id: RequestId,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub created_at: String,
    pub created_at_ms: i64,
    pub duration_ms: u64,
    pub status: PipelineStatus,
    pub cancelled: bool,
    pub input_hash: String,
    pub input_length: usize,
    #[serde(default)]
    pub response_hash: Option<String>,
    pub response_length: usize,
    #[serde(default)]
    pub intent: Option<IntentAudit>,
    #[serde(default)]
    pub shield: Option<ShieldAudit>,
    #[serde(default)]
    pub lens: Option<LensAudit>,
    #[serde(default)]
    pub stance: Option<Stance>,
    #[serde(default)]
    pub blocked_actions: Vec<Action>,
    #[serde(default)]
    pub generation: Option<GenerationAudit>,
    #[serde(default)]
    pub leak_guard: Option<LeakGuardRun>,
    pub gate_trace: Vec<GateRecord>,
    pub regeneration_count: u32,
    pub degraded: bool,
    #[serde(default)]
    pub stopped_at: Option<GateId>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub pending_ack_hash: Option<String>,
    #[serde(default)]
    pub ack_expires_at: Option<String>,
    #[serde(default)]
    pub invariant_results: Vec<InvariantResult>,
    #[serde(default)]
    pub critical_violations: Vec<String>,
    #[serde(default)]
    pub non_critical_violations: Vec<String>,
    pub crisis_resources_provided: bool,
    pub session_ended: bool,
    pub policy_versions: PolicyVersions,
}

/// Sealed audit record. Only readable once built; `record_hash` seals `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseAudit {
    content: AuditContent,
    record_hash: String,
}

impl ResponseAudit {
    pub(crate) fn seal(content: AuditContent) -> Result<Self, AuditError> {
        let record_hash = content_hash(&content)?;
        Ok(Self {
            content,
            record_hash,
        })
    }

    pub fn content(&self) -> &AuditContent {
        &self.content
    }

    pub fn audit_id(&self) -> &str {
        &self.content.audit_id
    }

    pub fn request_id(&self) -> &str {
        &self.content.request_id
    }

    pub fn status(&self) -> PipelineStatus {
        self.content.status
    }

    pub fn record_hash(&self) -> &str {
        &self.record_hash
    }

    /// Recomputes the seal; `false` means the record was altered after it was built.
    pub fn verify_integrity(&self) -> bool {
        content_hash(&self.content).is_ok_and(|hash| hash == self.record_hash)
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn content_hash(content: &AuditContent) -> Result<String, AuditError> {
    let value = serde_json::to_value(content)
        .map_err(|err| serialization_error(format!("audit content encode failed: {err}")))?;
    Ok(sha256_hex(&canonicalize_json(&value).to_string()))
}

fn canonicalize_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys = map.keys().cloned().collect::<Vec<_>>();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(item) = map.get(&key) {
                    sorted.insert(key, canonicalize_json(item));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize_json).collect())
        }
        primitive => primitive.clone(),
    }
}
