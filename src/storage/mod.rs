//! Document storage for domain records.
//!
//! Backends persist JSON documents grouped by entity kind and hand out
//! per-kind integer ids. [`Repository`] layers typed access on top.

#[cfg(feature = "db")]
pub mod database;
pub mod in_memory;

#[cfg(feature = "db")]
pub use database::DatabaseStorage;
pub use in_memory::InMemoryStorage;

use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Storage trait for persisting domain documents
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a new document and return the id assigned to it. The id is
    /// written into the document's `id` field.
    async fn insert(&self, kind: &'static str, doc: Value) -> Result<i64>;
    async fn get(&self, kind: &'static str, id: i64) -> Result<Option<Value>>;
    /// Overwrite an existing document; errors with not-found when absent.
    async fn replace(&self, kind: &'static str, id: i64, doc: Value) -> Result<()>;
    async fn remove(&self, kind: &'static str, id: i64) -> Result<bool>;
    /// All documents of a kind in id order.
    async fn scan(&self, kind: &'static str) -> Result<Vec<Value>>;
}

/// A record type that can be stored through a [`Repository`].
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage key for the record kind.
    const KIND: &'static str;
    /// Human readable name used in error messages.
    const NAME: &'static str;

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// Typed access to a [`Storage`] backend.
#[derive(Clone)]
pub struct Repository {
    storage: Arc<dyn Storage>,
}

impl Repository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()))
    }

    pub async fn create<T: Entity>(&self, mut value: T) -> Result<T> {
        let doc = serde_json::to_value(&value)?;
        let id = self.storage.insert(T::KIND, doc).await?;
        value.set_id(id);
        Ok(value)
    }

    pub async fn get<T: Entity>(&self, id: i64) -> Result<Option<T>> {
        match self.storage.get(T::KIND, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Like [`Repository::get`] but a missing record is an error.
    pub async fn require<T: Entity>(&self, id: i64) -> Result<T> {
        self.get(id)
            .await?
            .ok_or_else(|| ConsoleError::not_found(T::NAME, id))
    }

    pub async fn update<T: Entity>(&self, value: &T) -> Result<()> {
        let doc = serde_json::to_value(value)?;
        self.storage.replace(T::KIND, value.id(), doc).await
    }

    pub async fn delete<T: Entity>(&self, id: i64) -> Result<bool> {
        self.storage.remove(T::KIND, id).await
    }

    pub async fn list<T: Entity>(&self) -> Result<Vec<T>> {
        self.storage
            .scan(T::KIND)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(ConsoleError::from))
            .collect()
    }

    pub async fn find<T, F>(&self, predicate: F) -> Result<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send,
    {
        let mut items = self.list::<T>().await?;
        items.retain(|item| predicate(item));
        Ok(items)
    }

    pub async fn find_one<T, F>(&self, predicate: F) -> Result<Option<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send,
    {
        Ok(self.list::<T>().await?.into_iter().find(|item| predicate(item)))
    }

    pub async fn count<T, F>(&self, predicate: F) -> Result<usize>
    where
        T: Entity,
        F: Fn(&T) -> bool + Send,
    {
        Ok(self.find(predicate).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: i64,
        body: String,
    }

    impl Entity for Note {
        const KIND: &'static str = "note";
        const NAME: &'static str = "Note";

        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }
    }

    fn note(body: &str) -> Note {
        Note {
            id: 0,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let repo = Repository::in_memory();
        let first = repo.create(note("a")).await.unwrap();
        let second = repo.create(note("b")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let fetched: Note = repo.require(2).await.unwrap();
        assert_eq!(fetched, second);
    }

    #[tokio::test]
    async fn require_reports_entity_name() {
        let repo = Repository::in_memory();
        let err = repo.require::<Note>(9).await.unwrap_err();
        assert_eq!(err.to_string(), "Note 9 not found");
    }

    #[tokio::test]
    async fn update_of_missing_record_fails() {
        let repo = Repository::in_memory();
        let mut ghost = note("ghost");
        ghost.id = 42;
        assert!(matches!(
            repo.update(&ghost).await,
            Err(ConsoleError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn find_filters_and_delete_removes() {
        let repo = Repository::in_memory();
        for body in ["keep", "drop", "keep"] {
            repo.create(note(body)).await.unwrap();
        }
        let kept: Vec<Note> = repo.find(|n: &Note| n.body == "keep").await.unwrap();
        assert_eq!(kept.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 3]);

        assert!(repo.delete::<Note>(2).await.unwrap());
        assert!(!repo.delete::<Note>(2).await.unwrap());
        assert_eq!(repo.list::<Note>().await.unwrap().len(), 2);
    }
}
