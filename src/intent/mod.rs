pub mod classifier;
pub mod types;

pub use classifier::{IntentClassifier, KeywordIntentClassifier};
pub use types::{ClassificationError, IntentKind, IntentResult};
