use super::Storage;
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use libsql::{Builder, Connection, Database};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

/// Turso/libSQL backed storage. Every record is one row of the `documents` table.
pub struct DatabaseStorage {
    db: Database,
    // Serializes id allocation on insert.
    write_lock: Mutex<()>,
}

fn db_err(context: &str) -> impl Fn(libsql::Error) -> ConsoleError + '_ {
    move |e| ConsoleError::storage(format!("{context}: {e}"))
}

impl DatabaseStorage {
    /// Connect to `url`. `libsql://` and `https://` URLs are remote Turso
    /// databases and need `auth_token`; anything else is a local file path.
    pub async fn connect(url: &str, auth_token: Option<&str>) -> Result<Self> {
        let db = if url.starts_with("libsql://") || url.starts_with("https://") {
            let token = auth_token.ok_or_else(|| {
                ConsoleError::Config("database.auth_token is required for remote databases".into())
            })?;
            info!("Connecting to Turso database at {}", url);
            Builder::new_remote(url.to_string(), token.to_string())
                .build()
                .await
                .map_err(db_err("Failed to connect to database"))?
        } else {
            info!("Opening local database at {}", url);
            Builder::new_local(url)
                .build()
                .await
                .map_err(db_err("Failed to open database"))?
        };

        let storage = Self {
            db,
            write_lock: Mutex::new(()),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(db_err("Failed to get database connection"))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        let conn = self.connection()?;
        let migration_sql = include_str!("../../migrations/001_create_documents.sql");
        conn.execute_batch(migration_sql)
            .await
            .map_err(db_err("Failed to run migrations"))?;
        info!("Database migrations completed successfully");
        Ok(())
    }
}

fn decode(data: &str, id: i64) -> Result<Value> {
    let mut doc: Value = serde_json::from_str(data)?;
    if let Some(object) = doc.as_object_mut() {
        object.insert("id".to_string(), Value::from(id));
    }
    Ok(doc)
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn insert(&self, kind: &'static str, doc: Value) -> Result<i64> {
        if !doc.is_object() {
            return Err(ConsoleError::storage("documents must be JSON objects"));
        }
        let data = serde_json::to_string(&doc)?;
        let _guard = self.write_lock.lock().await;
        let conn = self.connection()?;
        let tx = conn
            .transaction()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        let mut rows = tx
            .query(
                "INSERT INTO sequences (kind, last_id) VALUES (?1, 1) \
                 ON CONFLICT(kind) DO UPDATE SET last_id = last_id + 1 \
                 RETURNING last_id",
                libsql::params![kind],
            )
            .await
            .map_err(db_err("Failed to allocate id"))?;
        let id = rows
            .next()
            .await
            .map_err(db_err("Failed to read allocated id"))?
            .ok_or_else(|| ConsoleError::storage("id allocation returned no row"))?
            .get::<i64>(0)
            .map_err(db_err("Failed to get id"))?;
        drop(rows);

        tx.execute(
            "INSERT INTO documents (kind, id, data) VALUES (?1, ?2, ?3)",
            libsql::params![kind, id, data],
        )
        .await
        .map_err(db_err("Failed to insert document"))?;
        tx.commit()
            .await
            .map_err(db_err("Failed to commit insert"))?;
        Ok(id)
    }

    async fn get(&self, kind: &'static str, id: i64) -> Result<Option<Value>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT data FROM documents WHERE kind = ? AND id = ?",
                libsql::params![kind, id],
            )
            .await
            .map_err(db_err("Failed to query document"))?;

        match rows.next().await.map_err(db_err("Failed to read row"))? {
            Some(row) => {
                let data: String = row.get(0).map_err(db_err("Failed to get data"))?;
                Ok(Some(decode(&data, id)?))
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, kind: &'static str, id: i64, doc: Value) -> Result<()> {
        let data = serde_json::to_string(&doc)?;
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE documents SET data = ?, updated_at = datetime('now') WHERE kind = ? AND id = ?",
                libsql::params![data, kind, id],
            )
            .await
            .map_err(db_err("Failed to update document"))?;
        if changed == 0 {
            return Err(ConsoleError::not_found(kind, id));
        }
        Ok(())
    }

    async fn remove(&self, kind: &'static str, id: i64) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "DELETE FROM documents WHERE kind = ? AND id = ?",
                libsql::params![kind, id],
            )
            .await
            .map_err(db_err("Failed to delete document"))?;
        Ok(changed > 0)
    }

    async fn scan(&self, kind: &'static str) -> Result<Vec<Value>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, data FROM documents WHERE kind = ? ORDER BY id",
                libsql::params![kind],
            )
            .await
            .map_err(db_err("Failed to scan documents"))?;

        let mut docs = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err("Failed to read row"))? {
            let id: i64 = row.get(0).map_err(db_err("Failed to get id"))?;
            let data: String = row.get(1).map_err(db_err("Failed to get data"))?;
            docs.push(decode(&data, id)?);
        }
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn local_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.db");
        let storage = DatabaseStorage::connect(path.to_str().unwrap(), None)
            .await
            .unwrap();

        let id = storage.insert("tag", json!({"name": "canal"})).await.unwrap();
        assert_eq!(id, 1);
        storage
            .replace("tag", id, json!({"name": "Canal"}))
            .await
            .unwrap();
        let doc = storage.get("tag", id).await.unwrap().unwrap();
        assert_eq!(doc, json!({"id": 1, "name": "Canal"}));

        assert!(storage.replace("tag", 99, json!({})).await.is_err());
        assert_eq!(storage.scan("tag").await.unwrap().len(), 1);
        assert!(storage.remove("tag", id).await.unwrap());
    }

    #[tokio::test]
    async fn deleted_ids_are_not_handed_out_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.db");
        let storage = DatabaseStorage::connect(path.to_str().unwrap(), None)
            .await
            .unwrap();

        let a = storage.insert("job", json!({"n": "a"})).await.unwrap();
        let b = storage.insert("job", json!({"n": "b"})).await.unwrap();
        assert_eq!((a, b), (1, 2));
        assert!(storage.remove("job", b).await.unwrap());
        let c = storage.insert("job", json!({"n": "c"})).await.unwrap();
        assert_eq!(c, 3);
        assert_eq!(storage.insert("tag", json!({})).await.unwrap(), 1);

        // Sequences survive reopening the file.
        drop(storage);
        let reopened = DatabaseStorage::connect(path.to_str().unwrap(), None)
            .await
            .unwrap();
        assert_eq!(reopened.insert("job", json!({"n": "d"})).await.unwrap(), 4);
    }
}
