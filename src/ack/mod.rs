pub mod error;
pub mod manager;
pub mod store;
pub mod types;

pub use error::{AckError, AckErrorKind, StoreError, StoreErrorKind};
pub use manager::AckTokenManager;
pub use store::{InMemoryKvStore, KvStore};
pub use types::{AckStoreConfig, AckToken, AckValidation, AckValidationReason, PendingAck};
