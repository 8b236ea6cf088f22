pub mod assessor;
pub mod classifier;
pub mod resources;
pub mod types;

pub use assessor::{RiskAssessor, SHIELD_POLICY_VERSION, decide, fail_closed};
pub use classifier::{PatternRiskClassifier, RiskClassifier};
pub use resources::{control_response, default_crisis_resources, render_crisis_resources};
pub use types::{
    CrisisResource, HarmCategory, InterventionLevel, RiskClassification, RiskSummary,
    ShieldConfig, StakesLevel, VetoType,
};
