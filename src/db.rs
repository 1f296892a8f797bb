//! Transient SQLite staging store for filter queries.
//!
//! A [`StagingStore`] lives for exactly one filter invocation: it is created
//! empty (any leftover file at the same path is removed first), filled by the
//! batch ingest, queried once, then torn down unless the caller asks to keep
//! it for inspection.
//!
//! # Example
//!
//! ```no_run
//! use feed_sdk::db::StagingStore;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StagingStore::create(Path::new("feed_staging.db")).await?;
//! // ingest and query...
//! let retained = store.close(false).await?;
//! assert!(retained.is_none());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use thiserror::Error;
use tracing::{debug, instrument};

/// Name of the single table holding ingested feed rows.
pub const STAGING_TABLE: &str = "feed";

/// File name of the staging database, created next to the filtered input.
pub const DEFAULT_STAGING_FILE: &str = "feed_staging.db";

/// Staging-store errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open or create the database.
    #[error("failed to open staging store {path}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    /// A statement against the store failed.
    #[error("staging store query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A stale or finished database file could not be removed.
    #[error("failed to remove staging store {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Single-connection SQLite database owned by one filter call.
#[derive(Debug)]
pub struct StagingStore {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl StagingStore {
    /// Creates a fresh on-disk store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cleanup`] if a stale file cannot be removed, or
    /// [`DbError::Connection`] if the database cannot be opened.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn create(path: &Path) -> Result<Self, DbError> {
        remove_if_exists(path).await?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Off)
            .synchronous(SqliteSynchronous::Off);

        let pool = single_connection_pool()
            .connect_with(options)
            .await
            .map_err(|source| DbError::Connection {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("staging store created");

        Ok(Self {
            pool,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory store, used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if SQLite cannot be initialised.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = single_connection_pool()
            .connect("sqlite::memory:")
            .await
            .map_err(|source| DbError::Connection {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Ok(Self { pool, path: None })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// On-disk location, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes the connection and deletes the database file unless `keep` is set.
    ///
    /// Returns the path of the retained file, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Cleanup`] if the file cannot be deleted.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn close(self, keep: bool) -> Result<Option<PathBuf>, DbError> {
        self.pool.close().await;
        match self.path {
            Some(path) if keep => {
                debug!("staging store retained");
                Ok(Some(path))
            }
            Some(path) => {
                remove_if_exists(&path).await?;
                debug!("staging store removed");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

fn single_connection_pool() -> SqlitePoolOptions {
    // In-memory databases vanish with their connection, so it must never be recycled.
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

async fn remove_if_exists(path: &Path) -> Result<(), DbError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DbError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Quotes an identifier for use in generated SQL.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
