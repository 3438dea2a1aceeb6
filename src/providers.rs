//! Factories that pick a persistent storage area when it works and fall back
//! to volatile in-memory storage when it does not.

use tracing::{info, warn};

use crate::error::StorageResult;
use crate::memory::InMemoryStorageService;
use crate::service::StorageBackend;
use crate::web::{StorageArea, WebStorageService, is_storage_available};

#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

#[cfg(not(target_arch = "wasm32"))]
use crate::file::FileStorageArea;

/// Storage selected by one of the provider factories.
#[derive(Debug, Clone)]
pub enum FallbackStorage<A> {
    /// The requested storage area passed the availability check.
    Persistent(WebStorageService<A>),
    /// The requested storage area was missing or unusable.
    Volatile(InMemoryStorageService),
}

impl<A> FallbackStorage<A> {
    pub fn is_persistent(&self) -> bool {
        matches!(self, FallbackStorage::Persistent(_))
    }
}

impl<A: StorageArea + Clone> StorageBackend for FallbackStorage<A> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match self {
            FallbackStorage::Persistent(storage) => storage.get_item(key),
            FallbackStorage::Volatile(storage) => storage.get_item(key),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        match self {
            FallbackStorage::Persistent(storage) => storage.set_item(key, value),
            FallbackStorage::Volatile(storage) => storage.set_item(key, value),
        }
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match self {
            FallbackStorage::Persistent(storage) => storage.remove_item(key),
            FallbackStorage::Volatile(storage) => storage.remove_item(key),
        }
    }

    fn clear_items(&self) -> StorageResult<()> {
        match self {
            FallbackStorage::Persistent(storage) => storage.clear_items(),
            FallbackStorage::Volatile(storage) => storage.clear_items(),
        }
    }

    fn contains_item(&self, key: &str) -> StorageResult<bool> {
        match self {
            FallbackStorage::Persistent(storage) => storage.contains_item(key),
            FallbackStorage::Volatile(storage) => storage.contains_item(key),
        }
    }
}

/// Wraps `area` in a storage service if it passes the availability check,
/// otherwise returns a fresh in-memory store. `name` is only used for logging.
pub fn storage_or_memory<A: StorageArea>(name: &str, area: Option<A>) -> FallbackStorage<A> {
    match area {
        Some(area) if is_storage_available(Some(&area)) => {
            info!("Using {} as persistent storage", name);
            FallbackStorage::Persistent(WebStorageService::new(area))
        }
        _ => {
            warn!("{} is unavailable, falling back to in-memory storage", name);
            FallbackStorage::Volatile(InMemoryStorageService::new())
        }
    }
}

/// Storage backed by the window's `localStorage`, or in-memory storage if it
/// is missing or blocked.
#[cfg(target_arch = "wasm32")]
pub fn local_storage() -> FallbackStorage<web_sys::Storage> {
    let area = web_sys::window().and_then(|window| window.local_storage().ok().flatten());
    storage_or_memory("localStorage", area)
}

/// Storage backed by the window's `sessionStorage`, or in-memory storage if
/// it is missing or blocked.
#[cfg(target_arch = "wasm32")]
pub fn session_storage() -> FallbackStorage<web_sys::Storage> {
    let area = web_sys::window().and_then(|window| window.session_storage().ok().flatten());
    storage_or_memory("sessionStorage", area)
}

/// Storage backed by a JSON file at `path`, or in-memory storage if the file
/// cannot be opened or written.
#[cfg(not(target_arch = "wasm32"))]
pub fn file_storage(path: impl AsRef<Path>) -> FallbackStorage<FileStorageArea> {
    let path = path.as_ref();
    let area = match FileStorageArea::open(path) {
        Ok(area) => Some(area),
        Err(e) => {
            warn!("Failed to open storage file {}: {}", path.display(), e);
            None
        }
    };
    storage_or_memory(&path.display().to_string(), area)
}
