use super::Storage;
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Value>,
}

/// In-memory storage implementation for development/testing
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<HashMap<&'static str, Table>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn with_id(mut doc: Value, id: i64) -> Result<Value> {
    match doc.as_object_mut() {
        Some(object) => {
            object.insert("id".to_string(), Value::from(id));
            Ok(doc)
        }
        None => Err(ConsoleError::storage("documents must be JSON objects")),
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn insert(&self, kind: &'static str, doc: Value) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        let table = tables.entry(kind).or_default();
        table.next_id += 1;
        let id = table.next_id;
        table.rows.insert(id, with_id(doc, id)?);

        debug!("Created {} with id {}", kind, id);
        Ok(id)
    }

    async fn get(&self, kind: &'static str, id: i64) -> Result<Option<Value>> {
        let tables = self.tables.lock().await;
        Ok(tables.get(kind).and_then(|t| t.rows.get(&id)).cloned())
    }

    async fn replace(&self, kind: &'static str, id: i64, doc: Value) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(kind)
            .and_then(|t| t.rows.get_mut(&id))
            .ok_or_else(|| ConsoleError::not_found(kind, id))?;
        *row = with_id(doc, id)?;
        Ok(())
    }

    async fn remove(&self, kind: &'static str, id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .get_mut(kind)
            .map(|t| t.rows.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn scan(&self, kind: &'static str) -> Result<Vec<Value>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(kind)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn ids_are_per_kind_and_never_reused() {
        let storage = InMemoryStorage::new();
        assert_eq!(storage.insert("tag", json!({"name": "a"})).await.unwrap(), 1);
        assert_eq!(storage.insert("tag", json!({"name": "b"})).await.unwrap(), 2);
        assert_eq!(storage.insert("media", json!({})).await.unwrap(), 1);

        assert!(storage.remove("tag", 2).await.unwrap());
        assert_eq!(storage.insert("tag", json!({"name": "c"})).await.unwrap(), 3);

        let doc = storage.get("tag", 3).await.unwrap().unwrap();
        assert_eq!(doc["id"], 3);
        assert_eq!(doc["name"], "c");
    }

    #[tokio::test]
    async fn non_object_documents_are_rejected() {
        let storage = InMemoryStorage::new();
        assert!(storage.insert("tag", json!([1, 2])).await.is_err());
    }
}
