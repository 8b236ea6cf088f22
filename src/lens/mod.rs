pub mod assist;
pub mod claims;
pub mod classify;
pub mod error;
pub mod http_search;
pub mod leak_guard;
pub mod retrieval;
pub mod tier;
pub mod types;
pub mod verifier;

pub use assist::LlmLensAssist;
pub use claims::{ClaimExtractor, KeyTermClaimExtractor};
pub use classify::{LensAssistVerdict, LensClassifierAssist, LensRiskClassifier};
pub use error::{RetrievalError, RetrievalErrorKind};
pub use http_search::HttpSearchProvider;
pub use leak_guard::{LeakGuard, LeakKind, LeakReport, LeakViolation, safe_template};
pub use retrieval::{EvidenceProvider, EvidenceRetriever, RetrievalSettings};
pub use tier::select_tier;
pub use types::{
    Claim, ClaimVerification, Confidence, DegradationReason, EvidenceItem, EvidencePack,
    EvidenceProviderConfig, LensConfig, LensConstraints, RetrievalOutcome, RiskFactor,
    SourceDocument, TieredLensResult, VerificationMode, VerificationTier,
};
pub use verifier::{LENS_POLICY_VERSION, TieredVerifier};
