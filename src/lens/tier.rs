use crate::lens::types::{LensClassification, LensConfig, VerificationTier};

/// Picks the verification tier. `floor` is raised by fail-closed upstream results and is never undercut.
pub fn select_tier(
    classification: &LensClassification,
    config: &LensConfig,
    floor: Option<VerificationTier>,
) -> VerificationTier {
    let selected = if classification.force_high
        || classification.risk_score >= config.high_threshold
    {
        VerificationTier::High
    } else if classification.risk_score < config.low_threshold && !classification.web_helpful {
        VerificationTier::Low
    } else {
        VerificationTier::Medium
    };

    match floor {
        Some(floor) => selected.max(floor),
        None => selected,
    }
}
