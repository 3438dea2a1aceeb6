//! StoreKit - typed key/value storage over string storage areas
//!
//! Values are written through a [`StorageTranscoder`] that turns them into
//! strings and back. Concrete stores keep those strings in memory
//! ([`InMemoryStorageService`]), in a browser `Storage` object or a JSON
//! file ([`WebStorageService`]), and every store can hand out views with a
//! different default transcoder ([`ProxyStorageService`]).
//!
//! ```
//! use storekit::{InMemoryStorageService, NumberTranscoder, StorageService};
//! use serde_json::json;
//!
//! let storage = InMemoryStorageService::new();
//! storage.set("user", &json!({ "name": "ada" }));
//!
//! let numbers = storage.with_default_transcoder(NumberTranscoder);
//! numbers.set("visits", &3.0);
//!
//! assert_eq!(storage.get("user"), Some(json!({ "name": "ada" })));
//! assert_eq!(numbers.get("visits"), Some(3.0));
//! assert_eq!(numbers.get("user"), None);
//! ```

pub mod config;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod file;
pub mod memory;
pub mod providers;
pub mod proxy;
pub mod service;
pub mod transcoder;
pub mod transcoders;
pub mod util;
pub mod web;

pub use error::{StorageError, StorageResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorageArea;
pub use memory::InMemoryStorageService;
#[cfg(not(target_arch = "wasm32"))]
pub use providers::file_storage;
#[cfg(target_arch = "wasm32")]
pub use providers::{local_storage, session_storage};
pub use providers::{FallbackStorage, storage_or_memory};
pub use proxy::ProxyStorageService;
pub use service::{StorageBackend, StorageService};
pub use transcoder::{StorageDecoder, StorageEncoder, StorageTranscoder};
pub use transcoders::{
    BooleanTranscoder, DateEpochTranscoder, DateIsoTranscoder, JsonTranscoder, NumberTranscoder,
    StringTranscoder, TranscoderKind,
};
pub use web::{StorageArea, WebStorageService, is_storage_available};
