//! # Key-Value Repository
//!
//! Raw access to the `kv_store` table. Values are opaque strings here;
//! encoding lives in [`crate::codec`].

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the key-value table.
#[derive(Debug, Clone)]
pub struct KvRepository {
    pool: SqlitePool,
}

impl KvRepository {
    pub fn new(pool: SqlitePool) -> Self {
        KvRepository { pool }
    }

    /// Returns the raw value stored under `key`.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Returns the full row, including its write time.
    pub async fn get_entry(&self, key: &str) -> DbResult<Option<KvEntry>> {
        let row = sqlx::query("SELECT key, value, updated_at FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let entry = row
            .map(|row| -> Result<KvEntry, sqlx::Error> {
                Ok(KvEntry {
                    key: row.try_get("key")?,
                    value: row.try_get("value")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .transpose()?;
        Ok(entry)
    }

    /// Inserts or replaces the value under `key`. Last write wins.
    pub async fn put(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, bytes = value.len(), "Writing kv entry");

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes `key`. Returns true if a row was deleted.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> DbResult<Vec<String>> {
        let keys = sqlx::query_scalar("SELECT key FROM kv_store ORDER BY key")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn repo() -> KvRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().kv()
    }

    #[tokio::test]
    async fn test_put_get_upsert() {
        let kv = repo().await;
        assert_eq!(kv.get("products").await.unwrap(), None);

        kv.put("products", "[]").await.unwrap();
        kv.put("products", "[1]").await.unwrap();

        assert_eq!(kv.get("products").await.unwrap().as_deref(), Some("[1]"));
        let entry = kv.get_entry("products").await.unwrap().unwrap();
        assert_eq!(entry.value, "[1]");
        assert_eq!(kv.keys().await.unwrap(), vec!["products".to_string()]);
    }

    #[tokio::test]
    async fn test_delete() {
        let kv = repo().await;
        kv.put("settings", "{}").await.unwrap();
        assert!(kv.delete("settings").await.unwrap());
        assert!(!kv.delete("settings").await.unwrap());
        assert!(kv.keys().await.unwrap().is_empty());
    }
}
