//! # Durable Store
//!
//! Typed, encoded values on top of the key-value table.
//!
//! ## Failure Policy
//! ```text
//!   load(key)            → Ok(Some(value)) | Ok(None) | Err(DbError)
//!   load_or(key, fb)     → value, or fb when the key is missing, the payload
//!                          is corrupt, the version is unknown or SQLite fails
//! ```
//!
//! Persistence is best effort: callers that must keep working offline use
//! [`DurableStore::load_or`] and never see the error, only a log line.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec;
use crate::error::DbResult;
use crate::repository::kv::KvRepository;

#[derive(Debug, Clone)]
pub struct DurableStore {
    kv: KvRepository,
}

impl DurableStore {
    pub fn new(kv: KvRepository) -> Self {
        DurableStore { kv }
    }

    /// Encodes and writes `value` under `key`.
    pub async fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = codec::encode(value)?;
        self.kv.put(key, &raw).await
    }

    /// Reads and decodes the value under `key`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.kv.get(key).await? {
            Some(raw) => Ok(Some(codec::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Like [`DurableStore::load`], degrading every failure to `fallback`.
    pub async fn load_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.load(key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key = %key, "No stored value, using fallback");
                fallback
            }
            Err(e) => {
                warn!(key = %key, error = %e, corrupt = e.is_corrupt_data(), "Stored value unreadable, using fallback");
                fallback
            }
        }
    }

    pub async fn remove(&self, key: &str) -> DbResult<bool> {
        self.kv.delete(key).await
    }

    /// Access to the raw rows underneath.
    pub fn kv(&self) -> &KvRepository {
        &self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use serde_json::{json, Value};

    async fn store() -> DurableStore {
        Database::new(DbConfig::in_memory()).await.unwrap().store()
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = store().await;
        store.save("categories", &vec!["Drinks", "Snacks"]).await.unwrap();

        let back: Option<Vec<String>> = store.load("categories").await.unwrap();
        assert_eq!(back, Some(vec!["Drinks".to_string(), "Snacks".to_string()]));

        let raw = store.kv().get("categories").await.unwrap().unwrap();
        assert!(raw.starts_with("tally:v1:"));
    }

    #[tokio::test]
    async fn test_legacy_plain_json_row() {
        let store = store().await;
        store.kv().put("settings", r#"{"store":{"name":"Old"}}"#).await.unwrap();

        let back: Value = store.load("settings").await.unwrap().unwrap();
        assert_eq!(back["store"]["name"], "Old");
    }

    #[tokio::test]
    async fn test_load_or_falls_back() {
        let store = store().await;
        let fallback = json!({ "fallback": true });

        // Missing key
        assert_eq!(store.load_or("nothing", fallback.clone()).await, fallback);

        // Unknown version
        store.kv().put("a", "tally:v2:AAAA").await.unwrap();
        assert!(store.load::<Value>("a").await.is_err());
        assert_eq!(store.load_or("a", fallback.clone()).await, fallback);

        // Corrupt body
        store.kv().put("b", "tally:v1:!!!").await.unwrap();
        assert_eq!(store.load_or("b", fallback.clone()).await, fallback);

        // Wrong shape
        store.save("c", &json!({ "x": 1 })).await.unwrap();
        assert_eq!(store.load_or::<Vec<u8>>("c", vec![7]).await, vec![7]);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store = db.store();
        store.save("k", &1).await.unwrap();
        db.close().await;

        assert!(store.save("k", &2).await.is_err());
        assert_eq!(store.load_or("k", 42).await, 42);
    }
}
