//! Encoder/decoder traits used to convert typed values to and from the
//! strings held by a storage medium.

/// Objects that can encode values of type `T` as strings for storage.
pub trait StorageEncoder<T: ?Sized> {
    /// Encodes `value` into its stored string representation.
    fn encode(&self, value: &T) -> String;
}

/// Objects that can decode stored strings into values of type `T`.
pub trait StorageDecoder<T> {
    /// Decodes `value`, returning `None` when it cannot be represented as `T`.
    fn decode(&self, value: &str) -> Option<T>;
}

/// Objects that can both encode and decode values of type `T`.
///
/// Implemented automatically for anything that is both a
/// [`StorageEncoder<T>`] and a [`StorageDecoder<T>`].
pub trait StorageTranscoder<T>: StorageEncoder<T> + StorageDecoder<T> {}

impl<T, C> StorageTranscoder<T> for C where C: StorageEncoder<T> + StorageDecoder<T> + ?Sized {}

impl<T: ?Sized, E: StorageEncoder<T> + ?Sized> StorageEncoder<T> for &E {
    fn encode(&self, value: &T) -> String {
        (**self).encode(value)
    }
}

impl<T, D: StorageDecoder<T> + ?Sized> StorageDecoder<T> for &D {
    fn decode(&self, value: &str) -> Option<T> {
        (**self).decode(value)
    }
}
