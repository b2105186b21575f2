use super::{Collection, DocumentStore, MemoryStore};
use crate::{QuizError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Memory store mirrored to one JSON array per collection under `data_dir`.
///
/// Reads are served from memory. Every write rewrites the affected collection
/// through a temp file and a rename, and only reaches memory once the rename
/// succeeded, so memory never holds a change the disk lacks.
pub struct JsonFileStore {
    dir: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let inner = MemoryStore::new();
        for collection in Collection::ALL {
            let path = Self::collection_path(&dir, collection);
            if !tokio::fs::try_exists(&path).await? {
                continue;
            }
            let raw = tokio::fs::read(&path).await?;
            let docs: Vec<Value> = serde_json::from_slice(&raw).map_err(|e| {
                QuizError::Storage(format!("corrupt snapshot {}: {}", path.display(), e))
            })?;
            let loaded = inner.load(collection, docs)?;
            debug!(collection = collection.name(), loaded, "Restored collection snapshot");
        }

        info!("Opened JSON file store at {}", dir.display());
        Ok(Self {
            dir,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    fn collection_path(dir: &Path, collection: Collection) -> PathBuf {
        dir.join(format!("{}.json", collection.name()))
    }

    async fn write_snapshot(&self, collection: Collection, docs: &[Value]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(docs)?;
        let path = Self::collection_path(&self.dir, collection);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            warn!(collection = collection.name(), error = %e, "Snapshot rename failed");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn put(&self, collection: Collection, id: Uuid, doc: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let docs = self.inner.preview_put(collection, id, doc.clone());
        self.write_snapshot(collection, &docs).await?;
        self.inner.put(collection, id, doc).await
    }

    async fn fetch(&self, collection: Collection, id: Uuid) -> Result<Option<Value>> {
        self.inner.fetch(collection, id).await
    }

    async fn remove(&self, collection: Collection, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(docs) = self.inner.preview_remove(collection, id) else {
            return Ok(false);
        };
        self.write_snapshot(collection, &docs).await?;
        self.inner.remove(collection, id).await
    }

    async fn scan(&self, collection: Collection) -> Result<Vec<Value>> {
        self.inner.scan(collection).await
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        self.inner.count(collection).await
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}
