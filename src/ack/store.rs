use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    ack::error::StoreError,
    clock::{Clock, SystemClock},
};

/// Key-value store with TTLs. `set_if_not_exists` and `take` must be atomic.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String, ttl_seconds: Option<u64>)
    -> Result<(), StoreError>;

    /// Returns `false` without writing when a live value already exists.
    async fn set_if_not_exists(
        &self,
        key: &str,
        value: String,
        ttl_seconds: Option<u64>,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomic read-and-delete. At most one concurrent caller receives the value.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at_ms: Option<i64>,
}

impl Entry {
    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_none_or(|expires_at| now_ms < expires_at)
    }
}

/// Process-local store. Suitable for a single gatehouse instance.
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl InMemoryKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn expiry(&self, ttl_seconds: Option<u64>) -> Option<i64> {
        ttl_seconds.map(|ttl| self.clock.now_ms().saturating_add((ttl as i64).saturating_mul(1_000)))
    }

    pub async fn live_entries(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let guard = self.entries.lock().await;
        guard.values().filter(|entry| entry.is_live(now_ms)).count()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now_ms = self.clock.now_ms();
        let mut guard = self.entries.lock().await;
        match guard.get(key) {
            Some(entry) if entry.is_live(now_ms) => Ok(Some(entry.value.clone())),
            Some(_) => {
                guard.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl_seconds: Option<u64>,
    ) -> Result<(), StoreError> {
        let expires_at_ms = self.expiry(ttl_seconds);
        let mut guard = self.entries.lock().await;
        guard.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn set_if_not_exists(
        &self,
        key: &str,
        value: String,
        ttl_seconds: Option<u64>,
    ) -> Result<bool, StoreError> {
        let now_ms = self.clock.now_ms();
        let expires_at_ms = self.expiry(ttl_seconds);
        let mut guard = self.entries.lock().await;
        if guard.get(key).is_some_and(|entry| entry.is_live(now_ms)) {
            return Ok(false);
        }
        guard.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms,
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now_ms = self.clock.now_ms();
        let mut guard = self.entries.lock().await;
        Ok(guard.remove(key).is_some_and(|entry| entry.is_live(now_ms)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let now_ms = self.clock.now_ms();
        let guard = self.entries.lock().await;
        Ok(guard.get(key).is_some_and(|entry| entry.is_live(now_ms)))
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now_ms = self.clock.now_ms();
        let mut guard = self.entries.lock().await;
        Ok(guard
            .remove(key)
            .filter(|entry| entry.is_live(now_ms))
            .map(|entry| entry.value))
    }
}
