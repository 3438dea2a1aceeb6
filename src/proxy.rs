use std::fmt;
use std::marker::PhantomData;

use crate::service::StorageService;
use crate::transcoder::{StorageDecoder, StorageEncoder, StorageTranscoder};

/// A storage service that forwards every operation to another service,
/// substituting its own default transcoder when the caller supplies none.
///
/// Proxies are usually obtained through
/// [`StorageService::with_default_transcoder`]. Both the proxy and its
/// subject see the same data.
pub struct ProxyStorageService<T, C, S> {
    default_transcoder: C,
    subject: S,
    _value: PhantomData<fn(T) -> T>,
}

impl<T, C, S> ProxyStorageService<T, C, S> {
    /// Creates a proxy that reads and writes through `subject`, using
    /// `default_transcoder` unless another transcoder is given explicitly.
    pub fn new(default_transcoder: C, subject: S) -> Self {
        Self {
            default_transcoder,
            subject,
            _value: PhantomData,
        }
    }

    pub fn default_transcoder(&self) -> &C {
        &self.default_transcoder
    }

    pub fn subject(&self) -> &S {
        &self.subject
    }
}

impl<T, C: Clone, S: Clone> Clone for ProxyStorageService<T, C, S> {
    fn clone(&self) -> Self {
        Self::new(self.default_transcoder.clone(), self.subject.clone())
    }
}

impl<T, C: fmt::Debug, S: fmt::Debug> fmt::Debug for ProxyStorageService<T, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyStorageService")
            .field("default_transcoder", &self.default_transcoder)
            .field("subject", &self.subject)
            .finish()
    }
}

impl<T, C, S> StorageService for ProxyStorageService<T, C, S>
where
    C: StorageTranscoder<T>,
    S: StorageService + Clone,
{
    type Value = T;
    type Subject = S;

    fn has(&self, key: &str) -> bool {
        self.subject.has(key)
    }

    fn get(&self, key: &str) -> Option<T> {
        self.subject.get_with(key, &self.default_transcoder)
    }

    fn get_with<X, D>(&self, key: &str, decoder: &D) -> Option<X>
    where
        D: StorageDecoder<X> + ?Sized,
    {
        self.subject.get_with(key, decoder)
    }

    fn set(&self, key: &str, value: &T) {
        self.subject.set_with(key, value, &self.default_transcoder)
    }

    fn set_with<X, E>(&self, key: &str, value: &X, encoder: &E)
    where
        X: ?Sized,
        E: StorageEncoder<X> + ?Sized,
    {
        self.subject.set_with(key, value, encoder)
    }

    fn remove(&self, key: &str) {
        self.subject.remove(key)
    }

    fn clear(&self) {
        self.subject.clear()
    }

    // Wraps the subject rather than this proxy so chains stay one level deep.
    fn with_default_transcoder<X, D>(&self, transcoder: D) -> ProxyStorageService<X, D, S>
    where
        D: StorageTranscoder<X>,
    {
        ProxyStorageService::new(transcoder, self.subject.clone())
    }
}
