use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{provider::CredentialRef, types::Domain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    PostCutoffFacts,
    SpecificNumbers,
    VolatileData,
    BreakingNews,
    HighStakesDomain,
}

impl RiskFactor {
    pub fn weight(self) -> u8 {
        match self {
            Self::PostCutoffFacts => 25,
            Self::SpecificNumbers => 20,
            Self::VolatileData => 30,
            Self::BreakingNews => 25,
            Self::HighStakesDomain => 35,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    Skipped,
    SingleProvider,
    MultiProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Ok,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    ModelOnly,
    Soft,
    Earned,
    Degraded,
    Insufficient,
}

impl Confidence {
    pub fn is_degraded_or_worse(self) -> bool {
        matches!(self, Self::Degraded | Self::Insufficient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModelOnly => "model_only",
            Self::Soft => "soft",
            Self::Earned => "earned",
            Self::Degraded => "degraded",
            Self::Insufficient => "insufficient",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationReason {
    RetrievalFailed,
    RetrievalPartial,
    InsufficientSources,
    ConflictingSources,
    NoOfficialSource,
    ClaimsUnverifiable,
}

impl DegradationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RetrievalFailed => "retrieval_failed",
            Self::RetrievalPartial => "retrieval_partial",
            Self::InsufficientSources => "insufficient_sources",
            Self::ConflictingSources => "conflicting_sources",
            Self::NoOfficialSource => "no_official_source",
            Self::ClaimsUnverifiable => "claims_unverifiable",
        }
    }

    /// User-facing qualification. Must stay free of digits so the leak guard never trips on it.
    pub fn freshness_warning(self) -> &'static str {
        match self {
            Self::RetrievalFailed => {
                "I couldn't reach live sources just now, so this may be out of date."
            }
            Self::RetrievalPartial => {
                "Only some sources could be checked, so parts of this may be incomplete or out of date."
            }
            Self::InsufficientSources => {
                "I couldn't find enough independent sources to confirm this."
            }
            Self::ConflictingSources => {
                "Sources disagree on this, so treat any specifics with caution."
            }
            Self::NoOfficialSource => {
                "I couldn't confirm this against an official source."
            }
            Self::ClaimsUnverifiable => "I wasn't able to verify the specific claims involved.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensClassification {
    pub web_helpful: bool,
    pub risk_score: u8,
    pub risk_factors: Vec<RiskFactor>,
    pub force_high: bool,
    pub domain: Domain,
    pub pattern_confidence: f32,
    #[serde(default)]
    pub llm_assisted: bool,
}

/// Document as returned by an evidence provider, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub source_domain: String,
    pub provider_id: String,
    pub official: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailureNote {
    pub provider_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePack {
    pub query: String,
    pub items: Vec<EvidenceItem>,
    pub providers_attempted: Vec<String>,
    pub providers_succeeded: Vec<String>,
    #[serde(default)]
    pub failures: Vec<ProviderFailureNote>,
}

impl EvidencePack {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            items: Vec::new(),
            providers_attempted: Vec::new(),
            providers_succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn has_official_source(&self) -> bool {
        self.items.iter().any(|item| item.official)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    pub key_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimVerification {
    pub claim_id: String,
    pub text: String,
    pub supporting_domains: Vec<String>,
    pub official_support: bool,
    pub verified: bool,
    pub conflicting: bool,
    #[serde(default)]
    pub licensed_numbers: BTreeSet<String>,
}

/// What generated text may state, derived from the evidence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LensConstraints {
    pub numeric_precision_allowed: bool,
    #[serde(default)]
    pub licensed_numbers: BTreeSet<String>,
    #[serde(default)]
    pub unverified_claims: Vec<Claim>,
    pub require_qualification: bool,
    #[serde(default)]
    pub freshness_warning: Option<String>,
    pub leak_guard_required: bool,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl LensConstraints {
    pub fn unrestricted() -> Self {
        Self {
            numeric_precision_allowed: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredLensResult {
    pub web_helpful: bool,
    pub risk_score: u8,
    pub risk_factors: Vec<RiskFactor>,
    pub force_high: bool,
    pub tier: VerificationTier,
    pub mode: VerificationMode,
    #[serde(default)]
    pub retrieval: Option<RetrievalOutcome>,
    #[serde(default)]
    pub requirements_met: Option<bool>,
    pub confidence: Confidence,
    #[serde(default)]
    pub evidence: Option<EvidencePack>,
    #[serde(default)]
    pub claims: Option<Vec<ClaimVerification>>,
    #[serde(default)]
    pub claims_unverified: Vec<String>,
    #[serde(default)]
    pub degradation_reason: Option<DegradationReason>,
    pub constraints: LensConstraints,
}

impl TieredLensResult {
    pub fn is_verified(&self) -> bool {
        matches!(self.confidence, Confidence::Soft | Confidence::Earned)
            && self.requirements_met == Some(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceProviderConfig {
    pub id: String,
    pub endpoint: String,
    #[serde(default = "default_credential_none")]
    pub credential: CredentialRef,
}

fn default_credential_none() -> CredentialRef {
    CredentialRef::None
}

fn default_low_threshold() -> u8 {
    30
}

fn default_high_threshold() -> u8 {
    70
}

fn default_min_sources_for_claim() -> usize {
    2
}

fn default_enabled_true() -> bool {
    true
}

fn default_llm_assist_confidence_threshold() -> f32 {
    0.5
}

fn default_provider_timeout_ms() -> u64 {
    4_000
}

fn default_global_timeout_ms() -> u64 {
    8_000
}

fn default_max_evidence_items() -> usize {
    12
}

fn default_official_domains() -> Vec<String> {
    ["who.int", "cdc.gov", "nih.gov", "sec.gov", "europa.eu"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LensConfig {
    #[serde(default = "default_low_threshold")]
    pub low_threshold: u8,
    #[serde(default = "default_high_threshold")]
    pub high_threshold: u8,
    #[serde(default = "default_min_sources_for_claim")]
    pub min_sources_for_claim: usize,
    #[serde(default = "default_enabled_true")]
    pub require_official_source: bool,
    #[serde(default = "default_enabled_true")]
    pub official_source_suffices: bool,
    #[serde(default = "default_llm_assist_confidence_threshold")]
    pub llm_assist_confidence_threshold: f32,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default = "default_global_timeout_ms")]
    pub global_timeout_ms: u64,
    #[serde(default = "default_max_evidence_items")]
    pub max_evidence_items: usize,
    #[serde(default = "default_official_domains")]
    pub official_domains: Vec<String>,
    #[serde(default)]
    pub evidence_providers: Vec<EvidenceProviderConfig>,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            high_threshold: default_high_threshold(),
            min_sources_for_claim: default_min_sources_for_claim(),
            require_official_source: true,
            official_source_suffices: true,
            llm_assist_confidence_threshold: default_llm_assist_confidence_threshold(),
            provider_timeout_ms: default_provider_timeout_ms(),
            global_timeout_ms: default_global_timeout_ms(),
            max_evidence_items: default_max_evidence_items(),
            official_domains: default_official_domains(),
            evidence_providers: Vec::new(),
        }
    }
}
