//! SQLite-backed local cache.
//!
//! Two logical keys, mirroring the browser-storage layout this replaces: one
//! single-row session record (the signed-in profile) and one AppData row per
//! user email. Payloads are stored as JSON text. The email, never the
//! account id, is the row key, so local and remote data only ever reconcile
//! for the same email.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::CacheError;
use crate::model::{AppData, UserProfile};

pub struct LocalCache {
    pool: SqlitePool,
    writes: AtomicU64,
}

impl LocalCache {
    /// Open (or create) the cache at `path`; ":memory:" yields an ephemeral
    /// cache for tests.
    pub async fn open(path: &str) -> Result<Self, CacheError> {
        if path == ":memory:" {
            return Self::open_in_memory().await;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        let cache = Self {
            pool,
            writes: AtomicU64::new(0),
        };
        cache.migrate().await?;
        Ok(cache)
    }

    pub async fn open_in_memory() -> Result<Self, CacheError> {
        // One connection only: every sqlite ":memory:" connection is its own
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionError(e.to_string()))?;

        let cache = Self {
            pool,
            writes: AtomicU64::new(0),
        };
        cache.migrate().await?;
        Ok(cache)
    }

    async fn migrate(&self) -> Result<(), CacheError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_data (
                email TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_user_data(&self, email: &str, data: &AppData) -> Result<(), CacheError> {
        if email.is_empty() {
            return Ok(());
        }
        let payload = serde_json::to_string(data)?;
        sqlx::query(
            "INSERT INTO user_data (email, payload, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(email) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at",
        )
        .bind(email)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(email, "saved user data to local cache");
        Ok(())
    }

    pub async fn load_user_data(&self, email: &str) -> Result<Option<AppData>, CacheError> {
        if email.is_empty() {
            return Ok(None);
        }
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM user_data WHERE email = ?1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(payload,)| serde_json::from_str(&payload))
            .transpose()
            .map_err(CacheError::from)
    }

    pub async fn delete_user_data(&self, email: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM user_data WHERE email = ?1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn save_session(&self, profile: &UserProfile) -> Result<(), CacheError> {
        let payload = serde_json::to_string(profile)?;
        sqlx::query(
            "INSERT INTO session (id, payload, updated_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at",
        )
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_session(&self) -> Result<Option<UserProfile>, CacheError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT payload FROM session WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(payload,)| serde_json::from_str(&payload))
            .transpose()
            .map_err(CacheError::from)
    }

    pub async fn clear_session(&self) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM session WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of user-data writes since open. Diagnostic accessor.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
