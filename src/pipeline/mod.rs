pub mod error;
pub mod gate;
pub mod gates;
pub mod result;
pub mod sequencer;
pub mod state;

pub use error::ServiceError;
pub use gate::{GateAction, GateId, GateRecord, GateResult, GateStatus};
pub use result::{DebugTrace, PipelineResult, PipelineStatus, Transparency};
pub use sequencer::{GateSequencer, new_audit_id, new_request_id};
pub use state::{LeakGuardRun, PipelineState, StopInfo};
pub use gates::{PersonaStyler, PersonalityContext, PersonalityPort, SparkSuggestion, StyledText};
