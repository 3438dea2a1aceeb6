//! JSON file backed storage area for native targets

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use tracing::debug;

use crate::error::StorageResult;
use crate::web::StorageArea;

type Entries = BTreeMap<String, String>;

/// A [`StorageArea`] persisted as a single JSON object of string values.
///
/// The whole file is rewritten after every mutation, through a temporary
/// file that is renamed into place. Clones share the same entries; separate
/// `open` calls on one path do not coordinate with each other.
#[derive(Debug, Clone)]
pub struct FileStorageArea {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl FileStorageArea {
    /// Open or create a file storage area
    ///
    /// Missing parent directories are created. A missing file is treated as
    /// empty and only created on the first write; a file that is not a JSON
    /// object of strings is an error.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Entries::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Entries::new()
        };
        debug!("Opened storage file {} with {} entries", path.display(), entries.len());

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                entries: RwLock::new(entries),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Get all keys, in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &Entries) -> StorageResult<()> {
        let serialized = serde_json::to_string_pretty(entries)?;

        let mut tmp_name = self
            .inner
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.inner.path.with_file_name(tmp_name);

        fs::write(&tmp_path, serialized)?;
        fs::rename(&tmp_path, &self.inner.path)?;
        Ok(())
    }
}

impl StorageArea for FileStorageArea {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self
            .inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.write();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.write();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut entries = self.write();
        let previous = std::mem::take(&mut *entries);

        if let Err(e) = self.persist(&entries) {
            *entries = previous;
            return Err(e);
        }
        Ok(())
    }
}
