//! libSQL persistence for resolved titles.
//!
//! The [`Store`] wraps a local libSQL database holding the result cache:
//! one row per title digest, written with an idempotent upsert. The cache
//! survives process restarts; schema setup runs idempotently on open.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};
use topicforge_shared::{Result, TopicForgeError};

/// Compute the cache key for a title: a SHA-256 hex digest of its exact
/// byte content. Stable across processes; distinct titles produce distinct
/// keys with overwhelming probability.
pub fn cache_key(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Storage handle wrapping the cache database.
pub struct Store {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Store {
    /// Open or create a cache database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TopicForgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| TopicForgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| TopicForgeError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TopicForgeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Look up the cached result for a key. A missing key is `Ok(None)`,
    /// never an error.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT result FROM resolved_titles WHERE title_hash = ?1",
                params![key],
            )
            .await
            .map_err(|e| TopicForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let result: String = row
                    .get(0)
                    .map_err(|e| TopicForgeError::Storage(e.to_string()))?;
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(TopicForgeError::Storage(e.to_string())),
        }
    }

    /// Upsert a result for a key. Repeated puts with the same key replace the
    /// prior value (last write wins), never duplicating the row.
    pub async fn put(&self, key: &str, text: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO resolved_titles (title_hash, result, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(title_hash) DO UPDATE SET
                   result = excluded.result,
                   created_at = excluded.created_at",
                params![key, text, now.as_str()],
            )
            .await
            .map_err(|e| TopicForgeError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Number of cached entries.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM resolved_titles", params![])
            .await
            .map_err(|e| TopicForgeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| TopicForgeError::Storage(e.to_string()))?;
                Ok(count as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(TopicForgeError::Storage(e.to_string())),
        }
    }

    /// Delete all cached entries. Returns how many rows were removed.
    pub async fn clear(&self) -> Result<u64> {
        self.conn
            .execute("DELETE FROM resolved_titles", params![])
            .await
            .map_err(|e| TopicForgeError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file store for testing.
    async fn test_store() -> Store {
        let tmp = std::env::temp_dir().join(format!("tf_test_{}.db", Uuid::now_v7()));
        Store::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("tf_test_{}.db", Uuid::now_v7()));
        let s1 = Store::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Store::open(&tmp).await.expect("second open");
        assert_eq!(s2.schema_version().await, 1);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = test_store().await;
        let found = store.get(&cache_key("never stored")).await.expect("get");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = test_store().await;
        let key = cache_key("Alpha");

        store.put(&key, "content-A").await.expect("put");

        let found = store.get(&key).await.expect("get");
        assert_eq!(found.as_deref(), Some("content-A"));
    }

    #[tokio::test]
    async fn put_is_idempotent_upsert() {
        let store = test_store().await;
        let key = cache_key("Alpha");

        store.put(&key, "first").await.expect("first put");
        store.put(&key, "second").await.expect("second put");

        let found = store.get(&key).await.expect("get");
        assert_eq!(found.as_deref(), Some("second"));
        // Exactly one row for the key, not a duplicate
        assert_eq!(store.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let tmp = std::env::temp_dir().join(format!("tf_test_{}.db", Uuid::now_v7()));
        let key = cache_key("Gamma");

        let store = Store::open(&tmp).await.expect("open");
        store.put(&key, "cached-content").await.expect("put");
        drop(store);

        let reopened = Store::open(&tmp).await.expect("reopen");
        let found = reopened.get(&key).await.expect("get");
        assert_eq!(found.as_deref(), Some("cached-content"));
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = test_store().await;
        store.put(&cache_key("a"), "1").await.unwrap();
        store.put(&cache_key("b"), "2").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let removed = store.clear().await.expect("clear");
        assert_eq!(removed, 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn cache_key_is_deterministic() {
        assert_eq!(cache_key("Alpha"), cache_key("Alpha"));
    }

    #[test]
    fn cache_key_distinguishes_titles() {
        assert_ne!(cache_key("Alpha"), cache_key("Beta"));
        assert_ne!(cache_key("Alpha"), cache_key("alpha"));
        assert_ne!(cache_key("Alpha"), cache_key("Alpha "));
    }

    #[test]
    fn cache_key_is_fixed_length_hex() {
        for title in ["a", "much longer title with spaces", "日本語"] {
            let key = cache_key(title);
            assert_eq!(key.len(), 64);
            assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
