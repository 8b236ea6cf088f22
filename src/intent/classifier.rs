use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::{
    capability::Action,
    intent::types::{ClassificationError, IntentKind, IntentResult},
    types::{ConversationContext, Domain},
};

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<IntentResult, ClassificationError>;
}

fn word_set(words: &[&str]) -> Regex {
    let alternation = words.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})")).expect("static keyword pattern compiles")
}

// Ordered by precedence: the first matching domain wins.
static DOMAIN_PATTERNS: LazyLock<Vec<(Domain, Regex)>> = LazyLock::new(|| {
    vec![
        (
            Domain::Safety,
            word_set(&[
                "bomb", "weapon", "explosive", "firearm", "gun", "poison", "hazard",
                "dangerous", "toxic", "chemical",
            ]),
        ),
        (
            Domain::Medical,
            word_set(&[
                "medication", "dose", "dosage", "prescri", "drug", "diagnos", "surgery",
                "treatment", "antibiotic", "insulin",
            ]),
        ),
        (
            Domain::Health,
            word_set(&[
                "health", "symptom", "diet", "fever", "headache", "pain", "allerg", "sleep",
                "calorie", "pregnan",
            ]),
        ),
        (
            Domain::Legal,
            word_set(&[
                "law", "legal", "lawsuit", "sue", "contract", "lawyer", "attorney", "court",
                "custody", "visa", "immigration",
            ]),
        ),
        (
            Domain::Financial,
            word_set(&[
                "invest", "stock", "share price", "savings", "retirement", "crypto", "bitcoin",
                "loan", "mortgage", "tax", "portfolio", "401k", "interest rate", "exchange rate",
            ]),
        ),
        (
            Domain::News,
            word_set(&["news", "breaking", "election", "announced", "headline"]),
        ),
        (
            Domain::Technology,
            word_set(&[
                "code", "rust", "python", "software", "computer", "api", "bug", "compile",
                "database",
            ]),
        ),
    ]
});

static EMOTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    word_set(&[
        "i feel", "i'm sad", "i am sad", "lonely", "depressed", "anxious", "hopeless",
        "end my life", "want to die",
    ])
});

static TASK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?(?:set|remind|schedule|create|write|send|book|draft|make me|add)\b")
        .expect("static task pattern compiles")
});

static ADVICE: LazyLock<Regex> = LazyLock::new(|| {
    word_set(&[
        "should i", "what should", "recommend", "advice", "is it wise", "better to",
        "would you suggest",
    ])
});

static QUESTION_LEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:who|what|when|where|why|how|is|are|can|does|do|did|will|which)\b")
        .expect("static question pattern compiles")
});

static NUMERIC_ASK: LazyLock<Regex> = LazyLock::new(|| {
    word_set(&["how much", "how many", "price", "rate", "percent", "number of", "cost"])
});

static FRESHNESS_ASK: LazyLock<Regex> = LazyLock::new(|| {
    word_set(&["latest", "current", "today", "news", "right now", "this week", "price"])
});

static REMINDER_ASK: LazyLock<Regex> = LazyLock::new(|| word_set(&["remind"]));

/// Deterministic keyword classifier used when no model-backed classifier is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn classify_text(&self, message: &str) -> IntentResult {
        let domain = DOMAIN_PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(message))
            .map(|(domain, _)| *domain)
            .unwrap_or(Domain::General);

        let (kind, confidence) = if EMOTIONAL.is_match(message) {
            (IntentKind::Emotional, 0.8)
        } else if TASK.is_match(message) {
            (IntentKind::Task, 0.75)
        } else if ADVICE.is_match(message) {
            (IntentKind::Advice, 0.75)
        } else if message.contains('?') || QUESTION_LEAD.is_match(message) {
            (IntentKind::Question, 0.7)
        } else {
            (IntentKind::Conversation, 0.5)
        };

        let mut requested_actions = vec![Action::Answer];
        if matches!(kind, IntentKind::Question | IntentKind::Advice) {
            requested_actions.push(Action::CiteSources);
            if FRESHNESS_ASK.is_match(message) {
                requested_actions.push(Action::WebSearch);
            }
            if NUMERIC_ASK.is_match(message) {
                requested_actions.push(Action::GiveNumericEstimate);
            }
        }
        if kind == IntentKind::Advice {
            requested_actions.push(Action::GiveRecommendation);
        }
        if kind == IntentKind::Task {
            requested_actions.push(Action::ExecuteTask);
        }
        if REMINDER_ASK.is_match(message) {
            requested_actions.push(Action::SetReminder);
        }
        if kind == IntentKind::Emotional {
            requested_actions.push(Action::ProvideCrisisResources);
        }
        requested_actions.push(Action::SuggestFollowUp);

        IntentResult {
            kind,
            domain,
            requested_actions,
            confidence,
            fallback: false,
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify(
        &self,
        message: &str,
        _context: &ConversationContext,
    ) -> Result<IntentResult, ClassificationError> {
        if message.trim().is_empty() {
            return Err(ClassificationError::new("message is empty"));
        }
        Ok(self.classify_text(message))
    }
}
