//! Durable asynchronous storage for the single snapshot blob.
//!
//! There is no compare-and-swap and no versioning: the last
//! [`put_snapshot`](BlockStore::put_snapshot) to complete wins, whatever the
//! writer had loaded before.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::kv::validate_key;
use crate::{Result, StoreError};

/// Profile-scoped storage holding exactly one snapshot under a fixed key.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Read the latest snapshot, if one was ever written.
    async fn get_snapshot(&self) -> Result<Option<String>>;

    /// Replace the stored snapshot.
    async fn put_snapshot(&self, blob: String) -> Result<()>;
}

/// In-memory block store. Clones share one blob, so several windows of the
/// same profile can be modelled by cloning a single instance.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlockStore {
    blob: Arc<Mutex<Option<String>>>,
    puts: Arc<AtomicU64>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put_snapshot` calls across all clones.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn get_snapshot(&self) -> Result<Option<String>> {
        Ok(self.blob.lock().await.clone())
    }

    async fn put_snapshot(&self, blob: String) -> Result<()> {
        *self.blob.lock().await = Some(blob);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// File-backed block store: `<dir>/<key>.snapshot`, replaced atomically.
///
/// Each put stages into its own randomly named file next to the target, so
/// windows writing at the same moment never share a staging path.
#[derive(Clone, Debug)]
pub struct FileBlockStore {
    path: PathBuf,
}

impl FileBlockStore {
    /// Create a store for `key` inside `dir`. The directory is created on the
    /// first write.
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Result<Self> {
        validate_key(key)?;
        Ok(Self {
            path: dir.as_ref().join(format!("{key}.snapshot")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{:016x}.tmp", rand::random::<u64>()));
        PathBuf::from(name)
    }
}

#[async_trait]
impl BlockStore for FileBlockStore {
    async fn get_snapshot(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::BlockStore(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn put_snapshot(&self, blob: String) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::BlockStore(e.to_string()))?;
        }
        let staging = self.staging_path();
        if let Err(e) = tokio::fs::write(&staging, blob.as_bytes()).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::BlockStore(format!(
                "write {}: {e}",
                staging.display()
            )));
        }
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(StoreError::BlockStore(format!(
                "rename {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_last_put_wins() {
        let store = MemoryBlockStore::new();
        assert_eq!(store.get_snapshot().await.expect("get"), None);

        store.put_snapshot("a".into()).await.expect("put");
        store.clone().put_snapshot("b".into()).await.expect("put");

        assert_eq!(store.get_snapshot().await.expect("get").as_deref(), Some("b"));
        assert_eq!(store.put_count(), 2);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileBlockStore::new(dir.path().join("profile"), "nook_db_snapshot")
            .expect("new");
        assert_eq!(store.get_snapshot().await.expect("get"), None);

        store.put_snapshot("first".into()).await.expect("put");
        store.put_snapshot("second".into()).await.expect("put");

        assert_eq!(store.get_snapshot().await.expect("get").as_deref(), Some("second"));
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_file_store_concurrent_puts_from_two_windows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = FileBlockStore::new(dir.path(), "nook_db_snapshot").expect("new");
        let b = FileBlockStore::new(dir.path(), "nook_db_snapshot").expect("new");
        let blob_a = "a".repeat(1 << 20);
        let blob_b = "b".repeat(1 << 20);

        for _ in 0..20 {
            let (ra, rb) = tokio::join!(
                a.put_snapshot(blob_a.clone()),
                b.put_snapshot(blob_b.clone())
            );
            ra.expect("put a");
            rb.expect("put b");

            let stored = a.get_snapshot().await.expect("get").expect("blob");
            assert!(stored == blob_a || stored == blob_b);
        }

        // Only the snapshot itself is left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, ["nook_db_snapshot.snapshot"]);
    }

    #[test]
    fn test_file_store_rejects_bad_key() {
        assert!(matches!(
            FileBlockStore::new("/tmp", "../snap"),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
