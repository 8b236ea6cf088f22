use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    Unavailable,
    Serialization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

pub fn store_unavailable(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorKind::Unavailable, message)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckErrorKind {
    StoreUnavailable,
    CorruptRecord,
    TokenCollision,
    InvalidRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckError {
    pub kind: AckErrorKind,
    pub message: String,
}

impl AckError {
    pub fn new(kind: AckErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AckError {}

impl From<StoreError> for AckError {
    fn from(err: StoreError) -> Self {
        match err.kind {
            StoreErrorKind::Unavailable => AckError::new(
                AckErrorKind::StoreUnavailable,
                format!("ack store unavailable: {}", err.message),
            ),
            StoreErrorKind::Serialization => AckError::new(
                AckErrorKind::CorruptRecord,
                format!("ack store record unreadable: {}", err.message),
            ),
        }
    }
}

pub fn invalid_request(message: impl Into<String>) -> AckError {
    AckError::new(AckErrorKind::InvalidRequest, message)
}

pub fn corrupt_record(message: impl Into<String>) -> AckError {
    AckError::new(AckErrorKind::CorruptRecord, message)
}
