//! Storage service backed by a browser `Storage` object
//!
//! [`StorageArea`] mirrors the native `Storage` surface (`getItem`,
//! `setItem`, `removeItem`, `clear`). `web_sys::Storage` implements it on
//! `wasm32`; native builds use [`crate::FileStorageArea`] or their own
//! implementation.

use tracing::debug;

use crate::error::StorageResult;
use crate::service::StorageBackend;
use crate::util::time::now_ms;

/// The raw string-keyed storage surface of a browser `Storage` object.
pub trait StorageArea {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;

    fn clear(&self) -> StorageResult<()>;
}

/// Storage service that wraps a [`StorageArea`], such as `localStorage` or
/// `sessionStorage`, so it can be used through
/// [`StorageService`](crate::StorageService).
///
/// The area must be a handle: clones of the service, and proxies created
/// from it, operate on the same entries.
#[derive(Debug, Clone)]
pub struct WebStorageService<A> {
    area: A,
}

impl<A: StorageArea> WebStorageService<A> {
    pub fn new(area: A) -> Self {
        Self { area }
    }

    pub fn area(&self) -> &A {
        &self.area
    }
}

impl<A: StorageArea + Clone> StorageBackend for WebStorageService<A> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.area.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.area.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.area.remove_item(key)
    }

    fn clear_items(&self) -> StorageResult<()> {
        self.area.clear()
    }
}

/// Checks whether the given storage area is present and functional.
///
/// Some browsers expose `localStorage`/`sessionStorage` objects that throw
/// on every access, Safari in private mode being the best known case. The
/// check writes a uniquely keyed entry, reads it back, and removes it; any
/// error or a mismatching value marks the area as unavailable.
pub fn is_storage_available<A: StorageArea + ?Sized>(area: Option<&A>) -> bool {
    let Some(area) = area else {
        debug!("Storage check: no storage area present");
        return false;
    };

    let now = now_ms();
    let key = format!("storage-test-entry-{}", now);
    let value = format!("storage-test-value-{}", now);

    let round_trip = || -> StorageResult<bool> {
        area.set_item(&key, &value)?;
        let retrieved = area.get_item(&key)?;
        area.remove_item(&key)?;
        Ok(retrieved.as_deref() == Some(value.as_str()))
    };

    match round_trip() {
        Ok(true) => true,
        Ok(false) => {
            debug!("Storage check: value read back differs from value written");
            false
        }
        Err(e) => {
            debug!("Storage check failed: {}", e);
            false
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::StorageArea;
    use crate::error::{StorageError, StorageResult};

    fn platform_error(key: Option<&str>, error: wasm_bindgen::JsValue) -> StorageError {
        let message = format!("{:?}", error);
        match key {
            Some(key) if message.contains("QuotaExceeded") => {
                StorageError::QuotaExceeded(key.to_string())
            }
            _ => StorageError::Platform(message),
        }
    }

    impl StorageArea for web_sys::Storage {
        fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
            web_sys::Storage::get_item(self, key).map_err(|e| platform_error(None, e))
        }

        fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
            web_sys::Storage::set_item(self, key, value).map_err(|e| platform_error(Some(key), e))
        }

        fn remove_item(&self, key: &str) -> StorageResult<()> {
            web_sys::Storage::remove_item(self, key).map_err(|e| platform_error(None, e))
        }

        fn clear(&self) -> StorageResult<()> {
            web_sys::Storage::clear(self).map_err(|e| platform_error(None, e))
        }
    }
}
