use std::sync::Arc;

use crate::{
    shield::{
        classifier::RiskClassifier,
        types::{
            InterventionLevel, RiskClassification, RiskSummary, ShieldConfig, StakesLevel,
            VetoType,
        },
    },
    types::{ConversationContext, Domain},
};

pub const SHIELD_POLICY_VERSION: &str = "shield-policy/v1";

/// Shield decision logic: classifier verdict in, intervention out.
pub struct RiskAssessor {
    classifier: Arc<dyn RiskClassifier>,
    config: ShieldConfig,
}

impl RiskAssessor {
    pub fn new(classifier: Arc<dyn RiskClassifier>, config: ShieldConfig) -> Self {
        Self { classifier, config }
    }

    pub fn config(&self) -> &ShieldConfig {
        &self.config
    }

    pub async fn assess(
        &self,
        message: &str,
        context: &ConversationContext,
        domain: Domain,
    ) -> RiskSummary {
        match self.classifier.classify(message, context).await {
            Ok(mut classification) => {
                if domain.is_force_high() && classification.stakes < StakesLevel::Medium {
                    classification.stakes = StakesLevel::Medium;
                    classification
                        .triggers
                        .push(format!("regulated_domain:{}", domain.as_str()));
                }
                decide(&classification, &self.config)
            }
            Err(err) => {
                tracing::warn!(
                    target: "shield",
                    error = %err,
                    "risk_classification_failed_closed"
                );
                fail_closed(err.to_string())
            }
        }
    }
}

/// Any classifier failure lands here: never weaker than medium stakes with friction.
pub fn fail_closed(reason: impl Into<String>) -> RiskSummary {
    RiskSummary {
        stakes: StakesLevel::Medium,
        intervention: InterventionLevel::Friction,
        veto_type: None,
        control_trigger: false,
        categories: Vec::new(),
        triggers: vec!["classification_failure".to_string(), reason.into()],
        crisis_resources: Vec::new(),
        session_end_recommended: false,
        classification_failed: true,
        override_applied: false,
        override_audit_id: None,
    }
}

pub fn decide(classification: &RiskClassification, config: &ShieldConfig) -> RiskSummary {
    let mut summary = RiskSummary {
        stakes: classification.stakes,
        intervention: InterventionLevel::None,
        veto_type: None,
        control_trigger: false,
        categories: classification.categories.clone(),
        triggers: classification.triggers.clone(),
        crisis_resources: Vec::new(),
        session_end_recommended: false,
        classification_failed: false,
        override_applied: false,
        override_audit_id: None,
    };

    let harms_others = classification
        .categories
        .iter()
        .any(|category| category.harms_others());
    let soft_veto_category = classification
        .categories
        .iter()
        .any(|category| config.soft_veto_categories.contains(category));

    match classification.stakes {
        StakesLevel::Critical => {
            // Control overrides veto, so no veto type is recorded.
            summary.control_trigger = true;
            summary.intervention = InterventionLevel::Veto;
            summary.crisis_resources = config.crisis_resources.clone();
            summary.session_end_recommended =
                classification.imminent && config.end_session_on_imminent_risk;
        }
        StakesLevel::High if harms_others => {
            summary.intervention = InterventionLevel::Veto;
            summary.veto_type = Some(VetoType::Hard);
        }
        StakesLevel::High | StakesLevel::Medium if soft_veto_category => {
            summary.intervention = InterventionLevel::Veto;
            summary.veto_type = Some(VetoType::Soft);
        }
        StakesLevel::High => {
            summary.intervention = InterventionLevel::Friction;
        }
        StakesLevel::Medium => {
            summary.intervention = InterventionLevel::Nudge;
        }
        StakesLevel::Low => {}
    }

    summary
}
