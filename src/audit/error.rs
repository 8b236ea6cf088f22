use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditErrorKind {
    Serialization,
    SinkUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditError {
    pub kind: AuditErrorKind,
    pub message: String,
}

impl AuditError {
    pub fn new(kind: AuditErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AuditError {}

pub fn serialization_error(message: impl Into<String>) -> AuditError {
    AuditError::new(AuditErrorKind::Serialization, message)
}

pub fn sink_unavailable(message: impl Into<String>) -> AuditError {
    AuditError::new(AuditErrorKind::SinkUnavailable, message)
}
