//! Database connection pool management
//!
//! One native sqlx pool per backend (MySQL, Postgres or SQLite), chosen by
//! `DbConfig::backend`. The pool is an explicit handle: create it once at
//! startup, pass clones to whatever runs queries, and `shutdown` it before
//! exit.

use std::sync::Arc;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{MySql, MySqlPool, PgPool, Postgres, Sqlite, SqlitePool};
use tracing::{info, warn};

use crate::config::{Backend, DbConfig, RowCountPolicy};
use crate::error::{OrmError, Result};

/// Native pool for the configured backend
pub(crate) enum NativePool {
    Mysql(MySqlPool),
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

/// Scoped connection; returned to the pool when dropped.
pub enum PooledConnection {
    Mysql(PoolConnection<MySql>),
    Postgres(PoolConnection<Postgres>),
    Sqlite(PoolConnection<Sqlite>),
}

/// Shared handle to the connection pool
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    pool: NativePool,
    backend: Backend,
    autocommit: bool,
    row_policy: RowCountPolicy,
}

fn pool_options<DB: sqlx::Database>(config: &DbConfig) -> PoolOptions<DB> {
    PoolOptions::new()
        .max_connections(config.maxsize)
        .min_connections(config.minsize)
        .acquire_timeout(config.acquire_timeout())
}

impl Database {
    /// Create the connection pool.
    ///
    /// Opens `minsize` connections up front; acquisition beyond `maxsize`
    /// waits for a release, up to the configured acquire timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the first connection fails.
    pub async fn create(config: &DbConfig) -> Result<Self> {
        config.validate()?;

        info!(
            url = %config.redacted_url(),
            minsize = config.minsize,
            maxsize = config.maxsize,
            "create database connection pool..."
        );

        let pool = match config.backend {
            Backend::Mysql => {
                let options: MySqlPoolOptions = pool_options(config);
                NativePool::Mysql(options.connect_with(config.mysql_options()).await?)
            }
            Backend::Postgres => {
                let options: PgPoolOptions = pool_options(config);
                NativePool::Postgres(options.connect_with(config.postgres_options()).await?)
            }
            Backend::Sqlite => {
                let options: SqlitePoolOptions = pool_options(config);
                NativePool::Sqlite(options.connect_with(config.sqlite_options()).await?)
            }
        };

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                pool,
                backend: config.backend,
                autocommit: config.autocommit,
                row_policy: config.row_count_policy(),
            }),
        })
    }

    pub(crate) fn pool(&self) -> &NativePool {
        &self.inner.pool
    }

    /// Borrow a connection, waiting if every connection is in use.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        Ok(match &self.inner.pool {
            NativePool::Mysql(pool) => PooledConnection::Mysql(pool.acquire().await?),
            NativePool::Postgres(pool) => PooledConnection::Postgres(pool.acquire().await?),
            NativePool::Sqlite(pool) => PooledConnection::Sqlite(pool.acquire().await?),
        })
    }

    /// Close the pool and wait for borrowed connections to come back.
    /// Later operations fail with [`OrmError::PoolClosed`].
    pub async fn shutdown(&self) {
        info!("close database connection pool...");
        match &self.inner.pool {
            NativePool::Mysql(pool) => pool.close().await,
            NativePool::Postgres(pool) => pool.close().await,
            NativePool::Sqlite(pool) => pool.close().await,
        }
    }

    pub fn is_closed(&self) -> bool {
        match &self.inner.pool {
            NativePool::Mysql(pool) => pool.is_closed(),
            NativePool::Postgres(pool) => pool.is_closed(),
            NativePool::Sqlite(pool) => pool.is_closed(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.inner.backend
    }

    /// Write mode used by [`Database::execute`]
    pub fn autocommit(&self) -> bool {
        self.inner.autocommit
    }

    pub fn row_count_policy(&self) -> RowCountPolicy {
        self.inner.row_policy
    }

    /// Live connections, idle or in use
    pub fn size(&self) -> u32 {
        match &self.inner.pool {
            NativePool::Mysql(pool) => pool.size(),
            NativePool::Postgres(pool) => pool.size(),
            NativePool::Sqlite(pool) => pool.size(),
        }
    }

    pub fn idle(&self) -> usize {
        match &self.inner.pool {
            NativePool::Mysql(pool) => pool.num_idle(),
            NativePool::Postgres(pool) => pool.num_idle(),
            NativePool::Sqlite(pool) => pool.num_idle(),
        }
    }

    /// Apply the row-count policy to a write that touched `actual` rows.
    pub(crate) fn check_affected(
        &self,
        operation: &'static str,
        table: &str,
        expected: u64,
        actual: u64,
    ) -> Result<()> {
        if actual == expected {
            return Ok(());
        }
        match self.inner.row_policy {
            RowCountPolicy::Warn => {
                warn!(
                    table,
                    expected, actual, "failed to {} record: affected rows: {}", operation, actual
                );
                Ok(())
            }
            RowCountPolicy::Error => Err(OrmError::RowCountMismatch {
                operation,
                table: table.to_string(),
                expected,
                actual,
            }),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.inner.backend)
            .field("size", &self.size())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn sqlite_pool(dir: &tempfile::TempDir, maxsize: u32) -> Database {
        let path = dir.path().join("pool.db");
        let mut config = DbConfig::sqlite(path.display().to_string());
        config.maxsize = maxsize;
        config.minsize = 1;
        Database::create(&config).await.expect("pool creation failed")
    }

    #[tokio::test]
    async fn pool_acquires_connection() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite_pool(&dir, 2).await;

        let conn = db.acquire().await.expect("acquire failed");
        assert!(db.size() >= 1);
        drop(conn);

        assert_eq!(db.backend(), Backend::Sqlite);
        assert!(db.autocommit());
        db.shutdown().await;
    }

    #[tokio::test]
    async fn concurrent_pool_access() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite_pool(&dir, 2).await;

        // 10 tasks over 2 connections: the extra borrowers wait instead of failing
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    let conn = db.acquire().await?;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    drop(conn);
                    Ok::<_, OrmError>(())
                })
            })
            .collect();

        for handle in handles {
            handle.await.expect("task panicked").expect("acquire failed");
        }
        assert!(db.size() <= 2);
    }

    #[tokio::test]
    async fn acquire_after_shutdown_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = sqlite_pool(&dir, 1).await;

        db.shutdown().await;
        assert!(db.is_closed());
        assert!(matches!(db.acquire().await, Err(OrmError::PoolClosed)));
    }

    #[tokio::test]
    async fn exhausted_pool_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeout.db");
        let mut config = DbConfig::sqlite(path.display().to_string());
        config.maxsize = 1;
        config.acquire_timeout_secs = 1;
        let db = Database::create(&config).await.unwrap();

        let held = db.acquire().await.unwrap();
        assert!(matches!(db.acquire().await, Err(OrmError::AcquireTimeout)));
        drop(held);
        assert!(db.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn invalid_config_rejected_before_connecting() {
        let mut config = DbConfig::sqlite("/nonexistent/never.db");
        config.maxsize = 0;
        assert!(matches!(
            Database::create(&config).await,
            Err(OrmError::Config { .. })
        ));
    }
}
