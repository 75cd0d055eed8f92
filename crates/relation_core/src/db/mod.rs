//! SQLite storage bootstrap, shared handle and schema migrations.
//!
//! # Responsibility
//! - Open and configure SQLite connections for relation core.
//! - Apply schema migrations in deterministic order.
//! - Share one connection process-wide behind an async-friendly handle.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write relation data before migrations succeed.

use thiserror::Error;

mod handle;
pub mod migrations;
mod open;

pub use handle::Database;
pub use open::{open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("sqlite connection mutex poisoned")]
    Poisoned,
    #[error("sqlite worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
