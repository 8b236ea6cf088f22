use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{capability::Action, types::Domain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Question,
    Advice,
    Task,
    Emotional,
    Conversation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub kind: IntentKind,
    pub domain: Domain,
    #[serde(default)]
    pub requested_actions: Vec<Action>,
    pub confidence: f32,
    /// Set when the classifier failed and this is the fail-closed substitute.
    #[serde(default)]
    pub fallback: bool,
}

impl IntentResult {
    pub fn conservative() -> Self {
        Self {
            kind: IntentKind::Question,
            domain: Domain::Unknown,
            requested_actions: vec![Action::Answer],
            confidence: 0.0,
            fallback: true,
        }
    }
}

/// Raised by the intent or risk classifiers; both fail closed on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationError {
    pub message: String,
}

impl ClassificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "classification failed: {}", self.message)
    }
}

impl std::error::Error for ClassificationError {}
