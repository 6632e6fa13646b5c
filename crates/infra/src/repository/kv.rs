//! Embedded ordered key/value store on SQLite.
//!
//! One `kv` table holds every bucket: `(bucket, key) → value`, with the
//! primary key giving ordered scans per bucket. The store owns a single
//! connection opened in exclusive locking mode, so the database file has one
//! writer at a time and a second process opening the same file fails with
//! `SQLITE_BUSY` once this one has touched it. Transactions group multi-key
//! updates into one atomic unit.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteLockingMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};

use iam_core::{IamError, IamResult};

#[derive(Debug, Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> IamResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .locking_mode(SqliteLockingMode::Exclusive)
            .busy_timeout(Duration::from_secs(1));

        Self::connect(options).await
    }

    /// Private in-memory database, gone when the store is dropped.
    pub async fn in_memory() -> IamResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| map_sqlx_error("open", e))?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> IamResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("open", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                bucket TEXT NOT NULL,
                key    TEXT NOT NULL,
                value  TEXT NOT NULL,
                PRIMARY KEY (bucket, key)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;

        Ok(Self { pool })
    }

    /// Close the underlying connection, releasing the file lock.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn get(&self, bucket: &str, key: &str) -> IamResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE bucket = ?1 AND key = ?2")
            .bind(bucket)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| r.try_get::<String, _>("value"))
            .transpose()
            .map_err(|e| map_sqlx_error("get", e))
    }

    /// Every `(key, value)` pair of `bucket`, ordered by key.
    pub async fn scan(&self, bucket: &str) -> IamResult<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM kv WHERE bucket = ?1 ORDER BY key ASC")
            .bind(bucket)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("scan", e))?;

        rows.into_iter()
            .map(|r| Ok((r.try_get("key")?, r.try_get("value")?)))
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("scan", e))
    }

    pub async fn put(&self, bucket: &str, key: &str, value: &str) -> IamResult<()> {
        let mut tx = self.begin().await?;
        tx.put(bucket, key, value).await?;
        tx.commit().await
    }

    /// Returns false when the key was absent.
    pub async fn delete(&self, bucket: &str, key: &str) -> IamResult<bool> {
        let mut tx = self.begin().await?;
        let removed = tx.delete(bucket, key).await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// Start a write transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> IamResult<KvTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(KvTransaction { tx })
    }
}

/// Atomic multi-key update.
pub struct KvTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl KvTransaction {
    pub async fn get(&mut self, bucket: &str, key: &str) -> IamResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv WHERE bucket = ?1 AND key = ?2")
            .bind(bucket)
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("tx get", e))?;

        row.map(|r| r.try_get::<String, _>("value"))
            .transpose()
            .map_err(|e| map_sqlx_error("tx get", e))
    }

    pub async fn put(&mut self, bucket: &str, key: &str, value: &str) -> IamResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (bucket, key, value) VALUES (?1, ?2, ?3)
            ON CONFLICT (bucket, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(bucket)
        .bind(key)
        .bind(value)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("put", e))?;
        Ok(())
    }

    pub async fn delete(&mut self, bucket: &str, key: &str) -> IamResult<bool> {
        let res = sqlx::query("DELETE FROM kv WHERE bucket = ?1 AND key = ?2")
            .bind(bucket)
            .bind(key)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn commit(self) -> IamResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> IamError {
    match err {
        sqlx::Error::Database(db_err) => {
            IamError::internal(format!("kv {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => IamError::internal(format!("kv {operation}: store closed")),
        other => IamError::internal(format!("kv {operation}: {other}")),
    }
}
