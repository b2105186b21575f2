use super::{document_id, Collection, DocumentStore};
use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default, Clone)]
struct Table {
    rows: HashMap<Uuid, (u64, Value)>,
    next_seq: u64,
}

impl Table {
    fn put(&mut self, id: Uuid, doc: Value) {
        match self.rows.get_mut(&id) {
            Some(row) => row.1 = doc,
            None => {
                self.rows.insert(id, (self.next_seq, doc));
                self.next_seq += 1;
            }
        }
    }

    fn ordered(&self) -> Vec<Value> {
        let mut rows: Vec<&(u64, Value)> = self.rows.values().collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, doc)| doc.clone()).collect()
    }
}

/// Process-local store; replacing a document keeps its original position.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Collection, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load documents in order, used when restoring a snapshot.
    pub fn load(&self, collection: Collection, docs: Vec<Value>) -> Result<usize> {
        let mut tables = self.tables.write();
        let table = tables.entry(collection).or_default();
        let mut loaded = 0;
        for doc in docs {
            let id = document_id(&doc)?;
            table.put(id, doc);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Ordered contents of `collection` as they would be after a put, without applying it.
    pub(crate) fn preview_put(&self, collection: Collection, id: Uuid, doc: Value) -> Vec<Value> {
        let mut table = self.tables.read().get(&collection).cloned().unwrap_or_default();
        table.put(id, doc);
        table.ordered()
    }

    /// Like [`Self::preview_put`] for a removal; `None` when `id` is absent.
    pub(crate) fn preview_remove(&self, collection: Collection, id: Uuid) -> Option<Vec<Value>> {
        let tables = self.tables.read();
        let table = tables.get(&collection)?;
        if !table.rows.contains_key(&id) {
            return None;
        }
        let mut table = table.clone();
        table.rows.remove(&id);
        Some(table.ordered())
    }

    pub(crate) fn snapshot(&self, collection: Collection) -> Vec<Value> {
        self.tables
            .read()
            .get(&collection)
            .map(Table::ordered)
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, collection: Collection, id: Uuid, doc: Value) -> Result<()> {
        self.tables.write().entry(collection).or_default().put(id, doc);
        Ok(())
    }

    async fn fetch(&self, collection: Collection, id: Uuid) -> Result<Option<Value>> {
        Ok(self
            .tables
            .read()
            .get(&collection)
            .and_then(|t| t.rows.get(&id))
            .map(|(_, doc)| doc.clone()))
    }

    async fn remove(&self, collection: Collection, id: Uuid) -> Result<bool> {
        Ok(self
            .tables
            .write()
            .get_mut(&collection)
            .and_then(|t| t.rows.remove(&id))
            .is_some())
    }

    async fn scan(&self, collection: Collection) -> Result<Vec<Value>> {
        Ok(self.snapshot(collection))
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self
            .tables
            .read()
            .get(&collection)
            .map_or(0, |t| t.rows.len()))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replace_keeps_position() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.put(Collection::Topics, a, json!({"id": a, "v": 1})).await.unwrap();
        store.put(Collection::Topics, b, json!({"id": b, "v": 2})).await.unwrap();
        store.put(Collection::Topics, a, json!({"id": a, "v": 3})).await.unwrap();

        let docs = store.scan(Collection::Topics).await.unwrap();
        assert_eq!(docs[0]["v"], 3);
        assert_eq!(docs[1]["v"], 2);
        assert_eq!(store.count(Collection::Topics).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.put(Collection::Users, id, json!({"id": id})).await.unwrap();
        assert!(store.remove(Collection::Users, id).await.unwrap());
        assert!(!store.remove(Collection::Users, id).await.unwrap());
        assert!(store.fetch(Collection::Users, id).await.unwrap().is_none());
    }

    #[test]
    fn load_rejects_documents_without_id() {
        let store = MemoryStore::new();
        assert!(store.load(Collection::Units, vec![json!({"name": "x"})]).is_err());
    }
}
