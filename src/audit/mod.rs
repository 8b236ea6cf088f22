pub mod builder;
pub mod error;
pub mod sink;
pub mod types;

pub use builder::AuditBuilder;
pub use error::{AuditError, AuditErrorKind};
pub use sink::{AuditSink, MemoryAuditSink, TracingAuditSink};
pub use types::{
    AuditContent, GenerationAudit, IntentAudit, LensAudit, PolicyVersions, ResponseAudit,
    ShieldAudit, sha256_hex,
};
