use thiserror::Error;

/// Errors raised by a storage medium.
///
/// These never reach callers of [`crate::StorageService`]; the service layer
/// logs them and reports the entry as absent instead.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The medium cannot be used at all (e.g. blocked in private browsing).
    #[error("storage is unavailable: {0}")]
    Unavailable(String),

    /// The medium refused a write because it is full.
    #[error("storage quota exceeded while writing '{0}'")]
    QuotaExceeded(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other error reported by the host platform.
    #[error("storage platform error: {0}")]
    Platform(String),
}

/// Result type for storage medium operations
pub type StorageResult<T> = Result<T, StorageError>;
