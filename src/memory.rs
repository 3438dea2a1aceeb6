use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StorageResult;
use crate::service::StorageBackend;

/// Volatile storage service backed by a process-local map.
///
/// Data stays available for as long as any handle to it is alive. Cloning
/// the service yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorageService {
    storage: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStorageService {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns `true` if both handles refer to the same underlying map.
    pub fn same_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    // A panic while holding the lock cannot leave the map half-updated, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for InMemoryStorageService {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.write().remove(key);
        Ok(())
    }

    fn clear_items(&self) -> StorageResult<()> {
        self.write().clear();
        Ok(())
    }

    fn contains_item(&self, key: &str) -> StorageResult<bool> {
        Ok(self.read().contains_key(key))
    }
}
