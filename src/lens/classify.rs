use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    intent::{ClassificationError, IntentResult},
    lens::types::{LensClassification, RiskFactor},
};

/// Verdict from a model-backed second opinion on ambiguous messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensAssistVerdict {
    pub web_helpful: bool,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
}

#[async_trait]
pub trait LensClassifierAssist: Send + Sync {
    async fn assess(&self, message: &str) -> Result<LensAssistVerdict, ClassificationError>;
}

fn factor_pattern(source: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{source})")).expect("static lens pattern compiles")
}

static FACTOR_PATTERNS: LazyLock<Vec<(RiskFactor, Regex)>> = LazyLock::new(|| {
    vec![
        (
            RiskFactor::PostCutoffFacts,
            factor_pattern(
                r"current(?:ly)?|latest|today|this (?:week|month|year)|right now|as of|recent(?:ly)?|upcoming|newest",
            ),
        ),
        (
            RiskFactor::SpecificNumbers,
            factor_pattern(
                r"how (?:much|many)|price|rate|percent(?:age)?|number of|cost|population|statistic|exact(?:ly)?|\d",
            ),
        ),
        (
            RiskFactor::VolatileData,
            factor_pattern(
                r"stock|share price|exchange rate|crypto|bitcoin|weather|score|interest rate|inflation|market",
            ),
        ),
        (
            RiskFactor::BreakingNews,
            factor_pattern(r"news|breaking|announced|election|headline|just happened"),
        ),
    ]
});

static FACTUAL_LEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:who|what|when|where|which|is|are|does|did|how)\b")
        .expect("static factual lead pattern compiles")
});

/// Pattern pass over the message; may consult an assist model when its own confidence is low.
pub struct LensRiskClassifier {
    assist: Option<Arc<dyn LensClassifierAssist>>,
    assist_confidence_threshold: f32,
}

impl LensRiskClassifier {
    pub fn new(
        assist: Option<Arc<dyn LensClassifierAssist>>,
        assist_confidence_threshold: f32,
    ) -> Self {
        Self {
            assist,
            assist_confidence_threshold,
        }
    }

    pub fn pattern_only() -> Self {
        Self::new(None, 0.0)
    }

    pub fn classify_patterns(&self, message: &str, intent: &IntentResult) -> LensClassification {
        let mut risk_factors: Vec<RiskFactor> = FACTOR_PATTERNS
            .iter()
            .filter(|(_, pattern)| pattern.is_match(message))
            .map(|(factor, _)| *factor)
            .collect();
        let force_high = intent.domain.is_force_high();
        if force_high {
            risk_factors.push(RiskFactor::HighStakesDomain);
        }

        let factual_question = FACTUAL_LEAD.is_match(message);
        let web_helpful = risk_factors.iter().any(|factor| {
            matches!(
                factor,
                RiskFactor::PostCutoffFacts | RiskFactor::VolatileData | RiskFactor::BreakingNews
            )
        }) || (factual_question && risk_factors.contains(&RiskFactor::SpecificNumbers));

        let pattern_confidence = match risk_factors.len() {
            0 if factual_question => 0.4,
            0 => 0.8,
            1 => 0.7,
            _ => 0.9,
        };

        LensClassification {
            web_helpful,
            risk_score: score(&risk_factors),
            risk_factors,
            force_high,
            domain: intent.domain,
            pattern_confidence,
            llm_assisted: false,
        }
    }

    pub async fn classify(&self, message: &str, intent: &IntentResult) -> LensClassification {
        let mut classification = self.classify_patterns(message, intent);
        let Some(assist) = &self.assist else {
            return classification;
        };
        if classification.pattern_confidence >= self.assist_confidence_threshold {
            return classification;
        }

        match assist.assess(message).await {
            Ok(verdict) => {
                classification.llm_assisted = true;
                // The assist can only raise risk, never lower it.
                classification.web_helpful |= verdict.web_helpful;
                for factor in verdict.risk_factors {
                    if !classification.risk_factors.contains(&factor) {
                        classification.risk_factors.push(factor);
                    }
                }
                classification.risk_score = score(&classification.risk_factors);
            }
            Err(err) => {
                tracing::warn!(
                    target: "lens",
                    error = %err,
                    "lens_assist_failed_assuming_web_helpful"
                );
                classification.web_helpful = true;
            }
        }
        classification
    }
}

fn score(factors: &[RiskFactor]) -> u8 {
    let total: u32 = factors.iter().map(|factor| u32::from(factor.weight())).sum();
    total.min(100) as u8
}
