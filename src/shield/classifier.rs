use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::{
    intent::ClassificationError,
    shield::types::{HarmCategory, RiskClassification, StakesLevel},
    types::ConversationContext,
};

#[async_trait]
pub trait RiskClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<RiskClassification, ClassificationError>;
}

struct RiskPattern {
    category: HarmCategory,
    stakes: StakesLevel,
    trigger: &'static str,
    pattern: Regex,
}

fn pattern(
    category: HarmCategory,
    stakes: StakesLevel,
    trigger: &'static str,
    source: &str,
) -> RiskPattern {
    RiskPattern {
        category,
        stakes,
        trigger,
        pattern: Regex::new(&format!("(?i){source}")).expect("static risk pattern compiles"),
    }
}

static RISK_PATTERNS: LazyLock<Vec<RiskPattern>> = LazyLock::new(|| {
    vec![
        pattern(
            HarmCategory::SelfHarm,
            StakesLevel::Critical,
            "self_harm_intent",
            r"\b(?:end(?:ing)? my (?:own )?life|kill(?:ing)? myself|suicid\w*|want to die|don'?t want to (?:live|be alive)|take my own life|hurt(?:ing)? myself|self[- ]harm)",
        ),
        pattern(
            HarmCategory::Weapons,
            StakesLevel::High,
            "weapon_construction",
            r"\b(?:(?:make|build|construct|assemble) (?:a |an )?(?:pipe )?(?:bomb|explosive|ied|weapon)|nerve agent|untraceable (?:gun|firearm)|3d[- ]print(?:ed)? (?:gun|firearm))",
        ),
        pattern(
            HarmCategory::Violence,
            StakesLevel::High,
            "violence_against_others",
            r"\b(?:kill|hurt|poison|attack) (?:him|her|them|someone|somebody|my (?:wife|husband|boss|neighbou?r|partner))\b",
        ),
        pattern(
            HarmCategory::IllegalActivity,
            StakesLevel::High,
            "illegal_activity",
            r"\b(?:launder(?:ing)? money|steal (?:a|someone'?s) car|hack into|counterfeit (?:money|bills)|evade (?:the )?police)",
        ),
        pattern(
            HarmCategory::RiskyFinancialAction,
            StakesLevel::Medium,
            "concentrated_financial_risk",
            r"\b(?:(?:all|most) (?:of )?my (?:life )?savings|life savings|put everything (?:in|into)|borrow(?:ing)? to invest|take out a loan to (?:invest|buy)|on margin|with leverage|remortgage)",
        ),
        pattern(
            HarmCategory::RiskyMedicalAction,
            StakesLevel::Medium,
            "unsupervised_medication_change",
            r"\b(?:double my (?:dose|dosage)|stop taking my|without (?:a )?prescription|mix(?:ing)? .{0,30} with alcohol)",
        ),
        pattern(
            HarmCategory::DangerousActivity,
            StakesLevel::Medium,
            "dangerous_activity",
            r"\b(?:drive (?:home )?(?:drunk|after drinking)|drunk driving|free[- ]solo|hold my breath underwater for)",
        ),
    ]
});

static IMMINENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tonight|right now|have the pills|goodbye|last message|this is the end|in an hour)\b")
        .expect("static imminence pattern compiles")
});

/// Regex-backed classifier used when no model-backed classifier is configured.
#[derive(Debug, Clone)]
pub struct PatternRiskClassifier {
    context_window_turns: usize,
}

impl Default for PatternRiskClassifier {
    fn default() -> Self {
        Self {
            context_window_turns: 3,
        }
    }
}

impl PatternRiskClassifier {
    pub fn new(context_window_turns: usize) -> Self {
        Self {
            context_window_turns,
        }
    }

    pub fn classify_text(&self, message: &str) -> RiskClassification {
        let mut classification = RiskClassification::low();
        for risk in RISK_PATTERNS.iter() {
            if !risk.pattern.is_match(message) {
                continue;
            }
            classification.stakes = classification.stakes.max(risk.stakes);
            if !classification.categories.contains(&risk.category) {
                classification.categories.push(risk.category);
            }
            classification.triggers.push(risk.trigger.to_string());
        }

        classification.imminent = classification.stakes == StakesLevel::Critical
            && IMMINENT.is_match(message);
        if classification.imminent {
            classification.triggers.push("imminent_risk".to_string());
        }
        classification
    }
}

#[async_trait]
impl RiskClassifier for PatternRiskClassifier {
    async fn classify(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<RiskClassification, ClassificationError> {
        if message.trim().is_empty() {
            return Err(ClassificationError::new("message is empty"));
        }

        let mut classification = self.classify_text(message);
        if classification.stakes < StakesLevel::Medium {
            let recent_crisis = context
                .recent_user_turns(self.context_window_turns)
                .any(|turn| {
                    self.classify_text(&turn.text).stakes == StakesLevel::Critical
                });
            if recent_crisis {
                classification.stakes = StakesLevel::Medium;
                classification
                    .triggers
                    .push("recent_crisis_context".to_string());
            }
        }
        Ok(classification)
    }
}
