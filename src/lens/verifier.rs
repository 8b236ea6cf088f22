use std::{collections::BTreeSet, sync::Arc};

use crate::{
    intent::IntentResult,
    lens::{
        claims::{ClaimExtractor, ClaimRules, KeyTermClaimExtractor, verify_claim},
        classify::LensRiskClassifier,
        leak_guard::extract_numeric_tokens,
        retrieval::EvidenceRetriever,
        tier::select_tier,
        types::{
            Claim, ClaimVerification, Confidence, DegradationReason, EvidencePack, LensConfig,
            LensConstraints, RetrievalOutcome, TieredLensResult, VerificationMode,
            VerificationTier,
        },
    },
};

pub const LENS_POLICY_VERSION: &str = "lens-policy/v1";

/// Confidence for a completed retrieval, before constraints are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeAssessment {
    pub confidence: Confidence,
    pub requirements_met: Option<bool>,
    pub degradation_reason: Option<DegradationReason>,
}

pub struct TieredVerifier {
    classifier: LensRiskClassifier,
    retriever: EvidenceRetriever,
    extractor: Arc<dyn ClaimExtractor>,
    config: LensConfig,
    retrieval_enabled: bool,
}

impl TieredVerifier {
    pub fn new(
        classifier: LensRiskClassifier,
        retriever: EvidenceRetriever,
        config: LensConfig,
    ) -> Self {
        Self {
            classifier,
            retriever,
            extractor: Arc::new(KeyTermClaimExtractor),
            config,
            retrieval_enabled: true,
        }
    }

    pub fn with_claim_extractor(mut self, extractor: Arc<dyn ClaimExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// With retrieval disabled every medium or high tier request degrades; the tier itself is kept.
    pub fn with_retrieval_enabled(mut self, enabled: bool) -> Self {
        self.retrieval_enabled = enabled;
        self
    }

    pub fn config(&self) -> &LensConfig {
        &self.config
    }

    #[tracing::instrument(name = "lens_verify", target = "lens", skip_all)]
    pub async fn verify(&self, message: &str, intent: &IntentResult) -> TieredLensResult {
        let classification = self.classifier.classify(message, intent).await;
        let floor = intent.fallback.then_some(VerificationTier::Medium);
        let tier = select_tier(&classification, &self.config, floor);

        let (mode, retrieval, evidence) = match tier {
            VerificationTier::Low => (VerificationMode::Skipped, None, None),
            VerificationTier::Medium => {
                let (outcome, pack) = if self.can_retrieve() {
                    self.retriever.retrieve_single(message).await
                } else {
                    (RetrievalOutcome::Failed, EvidencePack::empty(message))
                };
                (VerificationMode::SingleProvider, Some(outcome), Some(pack))
            }
            VerificationTier::High => {
                let (outcome, pack) = if self.can_retrieve() {
                    self.retriever.retrieve_fan_out(message).await
                } else {
                    (RetrievalOutcome::Failed, EvidencePack::empty(message))
                };
                (VerificationMode::MultiProvider, Some(outcome), Some(pack))
            }
        };

        let extracted = if tier == VerificationTier::High {
            self.extractor.extract(message)
        } else {
            Vec::new()
        };
        let claims = match (tier, &evidence) {
            (VerificationTier::High, Some(pack)) => {
                let rules = ClaimRules {
                    min_sources: self.config.min_sources_for_claim,
                    official_source_suffices: self.config.official_source_suffices,
                };
                Some(
                    extracted
                        .iter()
                        .map(|claim| verify_claim(claim, &pack.items, rules))
                        .collect::<Vec<_>>(),
                )
            }
            _ => None,
        };

        let assessment = assess_outcome(
            tier,
            retrieval,
            evidence.as_ref(),
            claims.as_deref(),
            &self.config,
        );
        let claims_unverified: Vec<String> = claims
            .iter()
            .flatten()
            .filter(|claim| !claim.verified)
            .map(|claim| claim.claim_id.clone())
            .collect();
        let constraints = derive_constraints(
            tier,
            &assessment,
            evidence.as_ref(),
            claims.as_deref(),
            &extracted,
        );

        tracing::info!(
            target: "lens",
            tier = ?tier,
            risk_score = classification.risk_score,
            force_high = classification.force_high,
            retrieval = ?retrieval,
            confidence = ?assessment.confidence,
            degradation_reason = assessment.degradation_reason.map(|reason| reason.as_str()),
            "lens_verification_completed"
        );

        TieredLensResult {
            web_helpful: classification.web_helpful,
            risk_score: classification.risk_score,
            risk_factors: classification.risk_factors,
            force_high: classification.force_high,
            tier,
            mode,
            retrieval,
            requirements_met: assessment.requirements_met,
            confidence: assessment.confidence,
            evidence,
            claims,
            claims_unverified,
            degradation_reason: assessment.degradation_reason,
            constraints,
        }
    }

    fn can_retrieve(&self) -> bool {
        self.retrieval_enabled && self.retriever.has_providers()
    }
}

pub fn assess_outcome(
    tier: VerificationTier,
    retrieval: Option<RetrievalOutcome>,
    evidence: Option<&EvidencePack>,
    claims: Option<&[ClaimVerification]>,
    config: &LensConfig,
) -> OutcomeAssessment {
    let degraded = |confidence, met, reason| OutcomeAssessment {
        confidence,
        requirements_met: Some(met),
        degradation_reason: Some(reason),
    };
    let has_items = evidence.is_some_and(|pack| !pack.items.is_empty());

    match (tier, retrieval) {
        (VerificationTier::Low, _) | (_, None) => OutcomeAssessment {
            confidence: Confidence::ModelOnly,
            requirements_met: None,
            degradation_reason: None,
        },
        (VerificationTier::Medium, Some(RetrievalOutcome::Failed)) => {
            degraded(Confidence::Degraded, false, DegradationReason::RetrievalFailed)
        }
        (VerificationTier::Medium, Some(_)) if !has_items => degraded(
            Confidence::Degraded,
            false,
            DegradationReason::InsufficientSources,
        ),
        (VerificationTier::Medium, Some(RetrievalOutcome::Partial)) => {
            degraded(Confidence::Degraded, true, DegradationReason::RetrievalPartial)
        }
        (VerificationTier::Medium, Some(RetrievalOutcome::Ok)) => OutcomeAssessment {
            confidence: Confidence::Soft,
            requirements_met: Some(true),
            degradation_reason: None,
        },
        (VerificationTier::High, Some(RetrievalOutcome::Failed)) => degraded(
            Confidence::Insufficient,
            false,
            DegradationReason::RetrievalFailed,
        ),
        (VerificationTier::High, Some(outcome)) => {
            let claims = claims.unwrap_or_default();
            let official_present = !config.require_official_source
                || evidence.is_some_and(EvidencePack::has_official_source);

            if !has_items {
                return degraded(
                    Confidence::Insufficient,
                    false,
                    DegradationReason::InsufficientSources,
                );
            }
            if claims.iter().any(|claim| !claim.verified) {
                let reason = if claims
                    .iter()
                    .any(|claim| !claim.verified && claim.supporting_domains.is_empty())
                {
                    DegradationReason::ClaimsUnverifiable
                } else if !official_present {
                    DegradationReason::NoOfficialSource
                } else {
                    DegradationReason::InsufficientSources
                };
                return degraded(Confidence::Insufficient, false, reason);
            }
            if !official_present {
                return degraded(
                    Confidence::Insufficient,
                    false,
                    DegradationReason::NoOfficialSource,
                );
            }
            if claims.iter().any(|claim| claim.conflicting) {
                return degraded(
                    Confidence::Degraded,
                    true,
                    DegradationReason::ConflictingSources,
                );
            }
            if outcome == RetrievalOutcome::Partial {
                return degraded(Confidence::Degraded, true, DegradationReason::RetrievalPartial);
            }
            OutcomeAssessment {
                confidence: Confidence::Earned,
                requirements_met: Some(true),
                degradation_reason: None,
            }
        }
    }
}

pub fn derive_constraints(
    tier: VerificationTier,
    assessment: &OutcomeAssessment,
    evidence: Option<&EvidencePack>,
    claims: Option<&[ClaimVerification]>,
    extracted: &[Claim],
) -> LensConstraints {
    let numeric_precision_allowed = matches!(
        assessment.confidence,
        Confidence::ModelOnly | Confidence::Soft | Confidence::Earned
    );

    let licensed_numbers: BTreeSet<String> = match (tier, claims) {
        (VerificationTier::High, Some(claims)) if numeric_precision_allowed => claims
            .iter()
            .flat_map(|claim| claim.licensed_numbers.iter().cloned())
            .collect(),
        (VerificationTier::Medium, _) if numeric_precision_allowed => evidence
            .into_iter()
            .flat_map(|pack| pack.items.iter())
            .flat_map(|item| extract_numeric_tokens(&item.snippet))
            .collect(),
        _ => BTreeSet::new(),
    };

    let unverified_claims = match claims {
        Some(claims) => extracted
            .iter()
            .filter(|claim| {
                claims
                    .iter()
                    .any(|verification| verification.claim_id == claim.id && !verification.verified)
            })
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let citations = evidence
        .map(|pack| pack.items.iter().map(|item| item.url.clone()).collect())
        .unwrap_or_default();

    LensConstraints {
        numeric_precision_allowed,
        licensed_numbers,
        unverified_claims,
        require_qualification: assessment.confidence.is_degraded_or_worse(),
        freshness_warning: assessment
            .degradation_reason
            .map(|reason| reason.freshness_warning().to_string()),
        leak_guard_required: tier != VerificationTier::Low
            || assessment.confidence.is_degraded_or_worse()
            || !numeric_precision_allowed,
        citations,
    }
}
