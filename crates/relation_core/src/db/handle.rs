//! Shared async handle over one SQLite connection.
//!
//! # Invariants
//! - Every statement runs on the blocking pool, never on a runtime worker.
//! - One statement closure holds the connection at a time; a closure that
//!   started running always finishes, even if its caller was dropped.

use super::{open_db, open_db_in_memory, DbError, DbResult};
use crate::config::DatabaseConfig;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::spawn_blocking;

/// Process-wide SQLite session, cheap to clone and safe to share.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Opens (and migrates) a database file on the blocking pool.
    pub async fn open(path: impl Into<PathBuf>, busy_timeout: Duration) -> DbResult<Self> {
        let path = path.into();
        let conn = spawn_blocking(move || open_db(path, busy_timeout)).await??;
        Ok(Self::from_connection(conn))
    }

    /// Opens the database described by `config`; no path means in-memory.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        match config.path.as_ref() {
            Some(path) => Self::open(path.clone(), config.busy_timeout()).await,
            None => Self::open_in_memory().await,
        }
    }

    /// Opens (and migrates) a private in-memory database.
    pub async fn open_in_memory() -> DbResult<Self> {
        let conn = spawn_blocking(open_db_in_memory).await??;
        Ok(Self::from_connection(conn))
    }

    /// Runs `func` against the connection on the blocking pool.
    ///
    /// Errors raised by the pool itself (poisoned mutex, panicked worker)
    /// are converted into the caller's error type through `DbError`.
    pub async fn with_conn<F, T, E>(&self, func: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| E::from(DbError::Poisoned))?;
            func(&mut guard)
        })
        .await
        .map_err(|err| E::from(DbError::Join(err)))?
    }
}
