pub mod matrix;

pub use matrix::{
    Action, ActionDecision, CAPABILITY_MATRIX_VERSION, CapabilityChecker, CapabilityReport,
    allowed_actions,
};
