pub mod capability;
pub mod intent;
pub mod invariant;
pub mod lens;
pub mod model;
pub mod personality;
pub mod shield;
pub mod spark;
pub mod stance;

pub use personality::{PersonaStyler, PersonalityContext, PersonalityPort, StyledText};
pub use spark::SparkSuggestion;
