//! Local durable cache
//!
//! A SQLite-backed key -> string store scoped to the client, used as the
//! offline fallback for the snapshot store and as the durable home of the
//! serialized layer list so the layer stack survives reloads.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::snapshot::DocumentSnapshot;

/// SQLite-backed key/value cache
pub struct LocalCache {
    pool: SqlitePool,
}

impl LocalCache {
    /// Create a cache over an existing pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open an in-memory cache (tests, ephemeral sessions)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        let cache = Self::new(pool);
        cache.init().await?;
        Ok(cache)
    }

    /// Open a file-backed cache, creating the database if needed
    pub async fn from_path(path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite://{path}?mode=rwc")).await?;
        let cache = Self::new(pool);
        cache.init().await?;
        Ok(cache)
    }

    /// Initialize the schema
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store a value
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO kv_cache (key, value, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a value
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    /// Remove a value
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write a full snapshot: composite under the document key, the
    /// per-layer map as JSON under the layers key.
    pub async fn save_snapshot(&self, document_id: &str, snapshot: &DocumentSnapshot) -> Result<()> {
        self.put(&document_key(document_id), &snapshot.composite)
            .await?;
        let layers_json = serde_json::to_string(&snapshot.layers)?;
        self.put(&layers_key(document_id), &layers_json).await?;
        Ok(())
    }

    /// Load the cached composite for a document
    pub async fn load_composite(&self, document_id: &str) -> Result<Option<String>> {
        self.get(&document_key(document_id)).await
    }

    /// Load the cached per-layer image map for a document
    pub async fn load_layer_images(
        &self,
        document_id: &str,
    ) -> Result<Option<HashMap<Uuid, String>>> {
        match self.get(&layers_key(document_id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Store the per-layer image map
    pub async fn save_layer_images(
        &self,
        document_id: &str,
        layers: &HashMap<Uuid, String>,
    ) -> Result<()> {
        let json = serde_json::to_string(layers)?;
        self.put(&layers_key(document_id), &json).await
    }
}

/// Cache key for a document's composite image
#[must_use]
pub fn document_key(document_id: &str) -> String {
    format!("tedit:document:{document_id}")
}

/// Cache key for a document's per-layer image map
#[must_use]
pub fn layers_key(document_id: &str) -> String {
    format!("tedit:document:{document_id}:layers")
}

/// Cache key for a document's serialized layer metadata list
#[must_use]
pub fn layer_list_key(document_id: &str) -> String {
    format!("tedit:layers:{document_id}")
}
