//! Small synchronous key/value area with a total size quota.
//!
//! Holds the legacy snapshot key and session bookkeeping. It is deliberately
//! not used for the live snapshot: the quota is far smaller than a grown
//! engine export.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Result, StoreError};

/// Default quota shared by every key in an area (5 MiB).
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// A synchronous string key/value area.
pub trait KvArea: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, failing with [`StoreError::QuotaExceeded`]
    /// if the area would grow past its quota.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory area. Clones share the same entries. Keys follow the same rules
/// as [`FileKvArea`].
#[derive(Clone, Debug)]
pub struct MemoryKvArea {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: usize,
}

impl MemoryKvArea {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            quota,
        }
    }
}

impl Default for MemoryKvArea {
    fn default() -> Self {
        Self::new()
    }
}

impl KvArea for MemoryKvArea {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let others: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(key, others + key.len() + value.len(), self.quota)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// File-backed area: one file per key inside `dir`.
#[derive(Clone, Debug)]
pub struct FileKvArea {
    dir: PathBuf,
    quota: usize,
}

impl FileKvArea {
    /// Open (creating if needed) an area rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>, quota: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::BlockStore(e.to_string()))?;
        Ok(Self { dir, quota })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.kv")))
    }

    /// Bytes used by every key except `skip`.
    fn used_except(&self, skip: &Path) -> Result<usize> {
        let mut used = 0usize;
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| StoreError::BlockStore(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::BlockStore(e.to_string()))?;
            let path = entry.path();
            if path == skip || path.extension().map_or(true, |ext| ext != "kv") {
                continue;
            }
            let len = entry
                .metadata()
                .map_err(|e| StoreError::BlockStore(e.to_string()))?
                .len() as usize;
            let key_len = path.file_stem().map_or(0, |s| s.len());
            used += key_len + len;
        }
        Ok(used)
    }
}

impl KvArea for FileKvArea {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::BlockStore(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let used = self.used_except(&path)?;
        check_quota(key, used + key.len() + value.len(), self.quota)?;
        std::fs::write(&path, value).map_err(|e| StoreError::BlockStore(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::BlockStore(e.to_string())),
        }
    }
}

fn check_quota(key: &str, size: usize, quota: usize) -> Result<()> {
    if size > quota {
        return Err(StoreError::QuotaExceeded {
            key: key.to_string(),
            size,
            quota,
        });
    }
    Ok(())
}

/// Keys become file names, so only a conservative character set is allowed.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
