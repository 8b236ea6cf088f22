use serde::{Deserialize, Serialize};

pub type RequestId = String;
pub type AuditId = String;
pub type SessionId = String;

/// Behavioral mode the assistant answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Control,
    Shield,
    Lens,
    Sword,
}

impl Stance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::Shield => "shield",
            Self::Lens => "lens",
            Self::Sword => "sword",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    General,
    Health,
    Medical,
    Legal,
    Financial,
    Safety,
    Technology,
    News,
    Unknown,
}

impl Domain {
    pub const FORCE_HIGH: [Domain; 5] = [
        Domain::Health,
        Domain::Medical,
        Domain::Legal,
        Domain::Financial,
        Domain::Safety,
    ];

    pub fn is_force_high(self) -> bool {
        Self::FORCE_HIGH.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Health => "health",
            Self::Medical => "medical",
            Self::Legal => "legal",
            Self::Financial => "financial",
            Self::Safety => "safety",
            Self::Technology => "technology",
            Self::News => "news",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl ConversationContext {
    pub fn recent_user_turns(&self, limit: usize) -> impl Iterator<Item = &ConversationTurn> {
        self.history
            .iter()
            .rev()
            .filter(|turn| turn.role == TurnRole::User)
            .take(limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    #[serde(default)]
    pub request_id: Option<RequestId>,
    pub message: String,
    #[serde(default)]
    pub context: ConversationContext,
    #[serde(default)]
    pub debug: bool,
}

impl PipelineInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            request_id: None,
            message: message.into(),
            context: ConversationContext::default(),
            debug: false,
        }
    }

    pub fn with_context(mut self, context: ConversationContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
