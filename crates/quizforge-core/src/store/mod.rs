//! Storage seam for the question bank.
//!
//! Backends only move JSON documents in and out of named collections; typing,
//! filtering and uniqueness live above them in [`Repository`] and the services.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::config_manager::StorageConfig;
use crate::types::{Course, Curriculum, PromptTemplate, Question, Subject, Topic, Unit, User};
use crate::{QuizError, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Curriculum,
    Subjects,
    Courses,
    Units,
    Topics,
    Questions,
    Prompts,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Users,
        Collection::Curriculum,
        Collection::Subjects,
        Collection::Courses,
        Collection::Units,
        Collection::Topics,
        Collection::Questions,
        Collection::Prompts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Curriculum => "curriculum",
            Collection::Subjects => "subjects",
            Collection::Courses => "courses",
            Collection::Units => "units",
            Collection::Topics => "topics",
            Collection::Questions => "questions",
            Collection::Prompts => "prompts",
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document.
    async fn put(&self, collection: Collection, id: Uuid, doc: Value) -> Result<()>;
    async fn fetch(&self, collection: Collection, id: Uuid) -> Result<Option<Value>>;
    /// Returns whether a document was removed.
    async fn remove(&self, collection: Collection, id: Uuid) -> Result<bool>;
    /// All documents of a collection in insertion order.
    async fn scan(&self, collection: Collection) -> Result<Vec<Value>>;

    async fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.scan(collection).await?.len())
    }

    fn backend_name(&self) -> &str;
}

/// A model persisted in exactly one collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
}

/// Typed access to one collection.
pub struct Repository<D> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for Repository<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D: Document> Repository<D> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn insert(&self, doc: &D) -> Result<()> {
        self.store
            .put(D::COLLECTION, doc.id(), serde_json::to_value(doc)?)
            .await
    }

    /// Same as insert; named for call sites that replace an existing document.
    pub async fn save(&self, doc: &D) -> Result<()> {
        self.insert(doc).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<D>> {
        match self.store.fetch(D::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        self.store.remove(D::COLLECTION, id).await
    }

    pub async fn all(&self) -> Result<Vec<D>> {
        self.store
            .scan(D::COLLECTION)
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(QuizError::from))
            .collect()
    }

    pub async fn find<F>(&self, pred: F) -> Result<Vec<D>>
    where
        F: Fn(&D) -> bool,
    {
        Ok(self.all().await?.into_iter().filter(|d| pred(d)).collect())
    }

    pub async fn find_one<F>(&self, pred: F) -> Result<Option<D>>
    where
        F: Fn(&D) -> bool,
    {
        Ok(self.all().await?.into_iter().find(|d| pred(d)))
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count(D::COLLECTION).await
    }

    pub async fn count_where<F>(&self, pred: F) -> Result<usize>
    where
        F: Fn(&D) -> bool,
    {
        Ok(self.all().await?.iter().filter(|d| pred(d)).count())
    }
}

/// Handle shared by every service: the backend plus a write lock that makes
/// check-then-write sequences (unique names, slugs, emails) atomic.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Opens the backend named in the storage config.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.backend.as_str() {
            "memory" => Arc::new(MemoryStore::new()),
            "file" => Arc::new(JsonFileStore::open(&config.data_dir).await?),
            other => {
                return Err(QuizError::Storage(format!(
                    "unknown storage backend '{}'",
                    other
                )))
            }
        };
        info!(backend = store.backend_name(), "Opened document store");
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn repo<D: Document>(&self) -> Repository<D> {
        Repository::new(self.store.clone())
    }

    pub async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub fn users(&self) -> Repository<User> {
        self.repo()
    }

    pub fn curricula(&self) -> Repository<Curriculum> {
        self.repo()
    }

    pub fn subjects(&self) -> Repository<Subject> {
        self.repo()
    }

    pub fn courses(&self) -> Repository<Course> {
        self.repo()
    }

    pub fn units(&self) -> Repository<Unit> {
        self.repo()
    }

    pub fn topics(&self) -> Repository<Topic> {
        self.repo()
    }

    pub fn questions(&self) -> Repository<Question> {
        self.repo()
    }

    pub fn prompts(&self) -> Repository<PromptTemplate> {
        self.repo()
    }
}

/// Reads the `id` field every stored document carries.
pub(crate) fn document_id(doc: &Value) -> Result<Uuid> {
    doc.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| QuizError::Storage("document without a valid id".to_string()))
}
