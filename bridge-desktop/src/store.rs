//! Library storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::LibraryStore,
};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const DATABASE_FILE: &str = "library.db";
const APP_DIR: &str = "mixtape";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS library_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// Default database location under the platform data directory.
pub fn default_store_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(DATABASE_FILE))
        .ok_or_else(|| BridgeError::NotAvailable("platform data directory".to_string()))
}

/// SQLite-backed library store
///
/// Each collection is one row holding its JSON document. Writes replace the
/// whole document.
pub struct SqliteLibraryStore {
    pool: SqlitePool,
}

impl SqliteLibraryStore {
    /// Open (or create) the store at `db_path`.
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        Self::init(&pool).await?;
        debug!(path = %display_name(&db_path), "Initialized library store");

        Ok(Self { pool })
    }

    /// Create an in-memory store (for testing)
    pub async fn in_memory() -> Result<Self> {
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        Self::init(&pool).await?;
        Ok(Self { pool })
    }

    async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM library_store ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to list keys: {}", e)))?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl LibraryStore for SqliteLibraryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM library_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to read {}: {}", key, e)))?;

        match row {
            Some(row) => {
                let raw: String = row.get(0);
                let value = serde_json::from_str(&raw)?;
                debug!(key = key, bytes = raw.len(), "Read collection");
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let raw = serde_json::to_string(&value)?;

        sqlx::query(
            r#"
            INSERT INTO library_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&raw)
        .bind(Self::now())
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to write {}: {}", key, e)))?;

        debug!(key = key, bytes = raw.len(), "Stored collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_absent_key() {
        let store = SqliteLibraryStore::in_memory().await.unwrap();
        assert!(store.get("playlist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = SqliteLibraryStore::in_memory().await.unwrap();
        let playlist = json!([{ "title": "A", "fileUrl": "/a.mp3" }]);

        store.set("playlist", playlist.clone()).await.unwrap();
        assert_eq!(store.get("playlist").await.unwrap(), Some(playlist));
    }

    #[tokio::test]
    async fn test_set_replaces_document() {
        let store = SqliteLibraryStore::in_memory().await.unwrap();
        store.set("albums", json!({ "Road": [] })).await.unwrap();
        store.set("albums", json!({})).await.unwrap();

        assert_eq!(store.get("albums").await.unwrap(), Some(json!({})));
        assert_eq!(store.keys().await.unwrap(), vec!["albums".to_string()]);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("mixtape-store-{}", std::process::id()));
        let path = dir.join("nested").join(DATABASE_FILE);

        {
            let store = SqliteLibraryStore::new(path.clone()).await.unwrap();
            store
                .set("searchHistory", json!(["jazz", "rock"]))
                .await
                .unwrap();
            store.pool.close().await;
        }

        let reopened = SqliteLibraryStore::new(path).await.unwrap();
        assert_eq!(
            reopened.get("searchHistory").await.unwrap(),
            Some(json!(["jazz", "rock"]))
        );

        reopened.pool.close().await;
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_default_path_is_under_app_dir() {
        if let Ok(path) = default_store_path() {
            assert!(path.ends_with("mixtape/library.db"));
        }
    }
}
