//! Storage service contract
//!
//! [`StorageBackend`] is the raw string layer a concrete medium implements.
//! [`StorageService`] is the typed layer callers use. Every backend is a
//! storage service whose default transcoder is
//! [`JsonTranscoder<serde_json::Value>`](crate::JsonTranscoder); other
//! defaults are obtained through [`StorageService::with_default_transcoder`].

use tracing::warn;

use crate::error::StorageResult;
use crate::proxy::ProxyStorageService;
use crate::transcoder::{StorageDecoder, StorageEncoder, StorageTranscoder};
use crate::transcoders::JsonTranscoder;

/// A concrete medium holding string entries.
///
/// Implementations are cheap handles: clones must refer to the same data.
pub trait StorageBackend: Clone {
    /// Returns the raw string stored for `key`, if any.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Creates or replaces the entry for `key`.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes the entry for `key`. Unknown keys are not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Removes all entries.
    fn clear_items(&self) -> StorageResult<()>;

    fn contains_item(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get_item(key)?.is_some())
    }
}

/// A key/value store bound to a default transcoder.
///
/// None of the operations fail: problems with the underlying medium are
/// logged and surface as a missing entry, and values that the decoder cannot
/// represent are returned as `None` as well.
pub trait StorageService {
    /// Type read and written by the default transcoder.
    type Value;

    /// Store that new services created by
    /// [`with_default_transcoder`](StorageService::with_default_transcoder)
    /// delegate to.
    type Subject: StorageService + Clone;

    /// Checks whether an entry with the specified key exists.
    fn has(&self, key: &str) -> bool;

    /// Reads the entry for `key` using the default transcoder.
    fn get(&self, key: &str) -> Option<Self::Value>;

    /// Reads the entry for `key` using `decoder`.
    ///
    /// Returns `None` if no entry exists or the decoder cannot represent the
    /// stored value.
    fn get_with<X, D>(&self, key: &str, decoder: &D) -> Option<X>
    where
        D: StorageDecoder<X> + ?Sized;

    /// Creates or updates the entry for `key` using the default transcoder.
    ///
    /// Reading it back yields an equivalent value, not necessarily an
    /// identical one.
    fn set(&self, key: &str, value: &Self::Value);

    /// Creates or updates the entry for `key` using `encoder`.
    fn set_with<X, E>(&self, key: &str, value: &X, encoder: &E)
    where
        X: ?Sized,
        E: StorageEncoder<X> + ?Sized;

    /// Removes the entry for `key`. Removing an unknown key has no effect.
    fn remove(&self, key: &str);

    /// Removes all entries.
    fn clear(&self);

    /// Creates a service that uses `transcoder` by default and shares this
    /// service's data. The default transcoder of `self` is left unchanged.
    fn with_default_transcoder<X, C>(&self, transcoder: C) -> ProxyStorageService<X, C, Self::Subject>
    where
        C: StorageTranscoder<X>;
}

impl<B: StorageBackend> StorageService for B {
    type Value = serde_json::Value;
    type Subject = B;

    fn has(&self, key: &str) -> bool {
        match self.contains_item(key) {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Failed to check entry '{}': {}", key, e);
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.get_with(key, &JsonTranscoder::<serde_json::Value>::new())
    }

    fn get_with<X, D>(&self, key: &str, decoder: &D) -> Option<X>
    where
        D: StorageDecoder<X> + ?Sized,
    {
        match self.get_item(key) {
            Ok(Some(raw)) => decoder.decode(&raw),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read entry '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &serde_json::Value) {
        self.set_with(key, value, &JsonTranscoder::<serde_json::Value>::new())
    }

    fn set_with<X, E>(&self, key: &str, value: &X, encoder: &E)
    where
        X: ?Sized,
        E: StorageEncoder<X> + ?Sized,
    {
        let encoded = encoder.encode(value);
        if let Err(e) = self.set_item(key, &encoded) {
            warn!("Failed to write entry '{}': {}", key, e);
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.remove_item(key) {
            warn!("Failed to remove entry '{}': {}", key, e);
        }
    }

    fn clear(&self) {
        if let Err(e) = self.clear_items() {
            warn!("Failed to clear storage: {}", e);
        }
    }

    fn with_default_transcoder<X, C>(&self, transcoder: C) -> ProxyStorageService<X, C, B>
    where
        C: StorageTranscoder<X>,
    {
        ProxyStorageService::new(transcoder, self.clone())
    }
}
