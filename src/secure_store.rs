//! `SecureStore`: the abstract device-local, access-controlled key/value
//! capability of spec §4.2. The core never assumes a concrete platform
//! backend; it depends only on this trait. Grounded on the teacher's
//! `StorageBackend`/`KeyStoreBackend` trait-plus-in-memory-impl shape.

use crate::error::CoreResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Access policy for a stored entry. Only one policy exists today; the
/// enum exists so the contract can grow without changing the trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePolicy {
    UnlockedThisDeviceOnly,
}

#[async_trait]
pub trait SecureStore: Send + Sync {
    async fn put(&self, key: &str, value: &[u8], policy: StorePolicy) -> CoreResult<()>;
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>>;
    async fn delete(&self, key: &str) -> CoreResult<()>;
    async fn exists(&self, key: &str) -> CoreResult<bool>;
    async fn clear_all(&self) -> CoreResult<()>;
}

/// In-memory reference backend. Deliberately plaintext (the real at-rest
/// encryption and device binding are a platform concern per §4.2) — this
/// exists for tests and as the shape platform adapters follow, the same
/// role the teacher's `MemoryStorageBackend` plays.
#[derive(Default)]
pub struct MemorySecureStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn put(&self, key: &str, value: &[u8], _policy: StorePolicy) -> CoreResult<()> {
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.data.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CoreResult<bool> {
        Ok(self.data.lock().unwrap_or_else(|e| e.into_inner()).contains_key(key))
    }

    async fn clear_all(&self) -> CoreResult<()> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}
