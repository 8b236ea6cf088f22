pub mod evaluator;
pub mod registry;
pub mod types;

pub use evaluator::InvariantEvaluator;
pub use registry::{CRITICAL_INVARIANTS, default_registry, is_critical};
pub use types::{
    INVARIANT_POLICY_VERSION, InvariantDefinition, InvariantGateOutput, InvariantPredicate,
    InvariantResult,
};
