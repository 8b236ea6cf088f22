use serde::{Deserialize, Serialize};

use crate::{shield::resources::default_crisis_resources, types::AuditId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakesLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionLevel {
    None,
    Nudge,
    Friction,
    Veto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoType {
    Soft,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmCategory {
    SelfHarm,
    Violence,
    Weapons,
    IllegalActivity,
    RiskyFinancialAction,
    RiskyMedicalAction,
    DangerousActivity,
}

impl HarmCategory {
    /// Categories whose high-stakes form is refused outright.
    pub fn harms_others(self) -> bool {
        matches!(
            self,
            Self::Violence | Self::Weapons | Self::IllegalActivity
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfHarm => "self_harm",
            Self::Violence => "violence",
            Self::Weapons => "weapons",
            Self::IllegalActivity => "illegal_activity",
            Self::RiskyFinancialAction => "risky_financial_action",
            Self::RiskyMedicalAction => "risky_medical_action",
            Self::DangerousActivity => "dangerous_activity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisResource {
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub region: Option<String>,
}

/// Raw classifier verdict before the intervention policy is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskClassification {
    pub stakes: StakesLevel,
    #[serde(default)]
    pub categories: Vec<HarmCategory>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub imminent: bool,
}

impl RiskClassification {
    pub fn low() -> Self {
        Self {
            stakes: StakesLevel::Low,
            categories: Vec::new(),
            triggers: Vec::new(),
            imminent: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub stakes: StakesLevel,
    pub intervention: InterventionLevel,
    #[serde(default)]
    pub veto_type: Option<VetoType>,
    pub control_trigger: bool,
    #[serde(default)]
    pub categories: Vec<HarmCategory>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub crisis_resources: Vec<CrisisResource>,
    #[serde(default)]
    pub session_end_recommended: bool,
    #[serde(default)]
    pub classification_failed: bool,
    #[serde(default)]
    pub override_applied: bool,
    #[serde(default)]
    pub override_audit_id: Option<AuditId>,
}

impl RiskSummary {
    pub fn is_hard_veto(&self) -> bool {
        !self.control_trigger
            && self.intervention == InterventionLevel::Veto
            && self.veto_type == Some(VetoType::Hard)
    }

    pub fn is_soft_veto(&self) -> bool {
        !self.control_trigger
            && self.intervention == InterventionLevel::Veto
            && self.veto_type == Some(VetoType::Soft)
    }

    /// Soft veto that still needs the user's acknowledgment.
    pub fn awaiting_override(&self) -> bool {
        self.is_soft_veto() && !self.override_applied
    }

    /// Only a soft veto can be overridden; anything else is left untouched.
    pub fn apply_override(&mut self, audit_id: impl Into<AuditId>) -> bool {
        if !self.is_soft_veto() {
            return false;
        }
        self.override_applied = true;
        self.override_audit_id = Some(audit_id.into());
        true
    }
}

fn default_soft_veto_categories() -> Vec<HarmCategory> {
    vec![
        HarmCategory::RiskyFinancialAction,
        HarmCategory::RiskyMedicalAction,
        HarmCategory::DangerousActivity,
    ]
}

fn default_ack_required_text() -> String {
    "I understand the risks".to_string()
}

fn default_ack_ttl_seconds() -> u64 {
    300
}

fn default_enabled_true() -> bool {
    true
}

fn default_context_window_turns() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    #[serde(default = "default_soft_veto_categories")]
    pub soft_veto_categories: Vec<HarmCategory>,
    #[serde(default = "default_ack_required_text")]
    pub ack_required_text: String,
    #[serde(default = "default_ack_ttl_seconds")]
    pub ack_ttl_seconds: u64,
    #[serde(default = "default_enabled_true")]
    pub end_session_on_imminent_risk: bool,
    #[serde(default = "default_crisis_resources")]
    pub crisis_resources: Vec<CrisisResource>,
    #[serde(default = "default_context_window_turns")]
    pub context_window_turns: usize,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            soft_veto_categories: default_soft_veto_categories(),
            ack_required_text: default_ack_required_text(),
            ack_ttl_seconds: default_ack_ttl_seconds(),
            end_session_on_imminent_risk: true,
            crisis_resources: default_crisis_resources(),
            context_window_turns: default_context_window_turns(),
        }
    }
}
