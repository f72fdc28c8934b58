//! SQLite-backed tombstone store.
//!
//! Mirrors browser local storage: a `local_storage` key/value table where the
//! tombstone list lives under [`TOMBSTONE_SLOT`]. Survives process restarts.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use catalog_core::ProductId;

use crate::config::ClientConfig;
use crate::tombstone::{TOMBSTONE_SLOT, TombstoneError, TombstoneStore, decode_slot, encode_slot};

/// SQLite-backed [`TombstoneStore`].
///
/// Cheap to clone; clones share the same lazily opened pool.
#[derive(Debug, Clone)]
pub struct SqliteTombstoneStore {
    path: PathBuf,
    pool: Arc<Mutex<Option<SqlitePool>>>,
    /// Serializes read-modify-write cycles on the slot.
    write_lock: Arc<Mutex<()>>,
}

impl SqliteTombstoneStore {
    /// Create a store backed by the database at `path` (lazy initialization).
    ///
    /// The database file and its parent directory are created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: Arc::new(Mutex::new(None)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Use `config.storage_path`, or the per-user default location.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let path = match &config.storage_path {
            Some(path) => path.clone(),
            None => default_storage_path()?,
        };
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the pool, initializing if necessary.
    async fn get_pool(&self) -> anyhow::Result<SqlitePool> {
        let mut pool_guard = self.pool.lock().await;
        if let Some(pool) = pool_guard.as_ref() {
            return Ok(pool.clone());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create storage directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite storage at {:?}", self.path))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create local_storage table")?;

        *pool_guard = Some(pool.clone());
        Ok(pool)
    }

    async fn read_slot(&self) -> anyhow::Result<Option<String>> {
        let pool = self.get_pool().await?;

        let row = sqlx::query(
            r#"
            SELECT value
            FROM local_storage
            WHERE key = ?1
            "#,
        )
        .bind(TOMBSTONE_SLOT)
        .fetch_optional(&pool)
        .await
        .context("failed to read tombstone slot")?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn write_slot(&self, value: &str) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(TOMBSTONE_SLOT)
        .bind(value)
        .execute(&pool)
        .await
        .context("failed to write tombstone slot")?;

        Ok(())
    }
}

#[async_trait]
impl TombstoneStore for SqliteTombstoneStore {
    async fn load(&self) -> BTreeSet<ProductId> {
        match self.read_slot().await {
            Ok(raw) => decode_slot(raw.as_deref()),
            Err(err) => {
                tracing::warn!("failed to load tombstones, treating as empty: {err:#}");
                BTreeSet::new()
            }
        }
    }

    async fn record(&self, id: ProductId) -> Result<(), TombstoneError> {
        let _guard = self.write_lock.lock().await;

        let raw = self.read_slot().await?;
        let mut ids = decode_slot(raw.as_deref());
        if !ids.insert(id) && raw.is_some() {
            return Ok(());
        }

        self.write_slot(&encode_slot(&ids)?).await?;
        tracing::debug!(%id, total = ids.len(), "tombstone recorded");
        Ok(())
    }
}

/// Resolve the default database location: `{app_data_dir}/catalog/storage.db`.
fn default_storage_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("catalog");
    path.push("storage.db");
    Ok(path)
}
