//! Repository layer: store contracts, upsert, and persistence implementations.
//!
//! # Responsibility
//! - Define the minimal store capability (`RowStore`): point lookup and
//!   full-row write, plus delete and owner-partition scans.
//! - Layer the upsert operation on top of any store (`UpsertRepository`).
//! - Classify raw store faults into the caller-facing error taxonomy.
//!
//! # Invariants
//! - Lookup-stage faults surface as `RepoError::StorageUnavailable`.
//! - Write-stage faults surface as `RepoError::Persistence`.
//! - `InvalidRelation` passes through unchanged and is never retried.

use crate::db::DbError;
use crate::model::relation::{InvalidRelationError, OwnerId};
use crate::model::resource::ResourceValidationError;
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use thiserror::Error;

pub mod memory_store;
pub mod relation_repo;
pub mod resource_repo;
pub mod upsert;

pub type StoreResult<T> = Result<T, StoreError>;
pub type RepoResult<T> = Result<T, RepoError>;

/// Raw fault reported by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    InvalidRelation(#[from] InvalidRelationError),
    #[error(transparent)]
    Validation(#[from] ResourceValidationError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("store offline: {0}")]
    Offline(String),
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Caller-facing error for repository and service operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    InvalidRelation(#[from] InvalidRelationError),
    #[error(transparent)]
    Validation(#[from] ResourceValidationError),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),
    #[error("persistence failed: {0}")]
    Persistence(#[source] StoreError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("operation cancelled before write")]
    Cancelled,
}

impl RepoError {
    /// Classifies a fault raised while reading.
    pub fn from_lookup(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRelation(err) => Self::InvalidRelation(err),
            StoreError::Validation(err) => Self::Validation(err),
            StoreError::InvalidData(message) => Self::InvalidData(message),
            other => Self::StorageUnavailable(other),
        }
    }

    /// Classifies a fault raised while writing or deleting.
    pub fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRelation(err) => Self::InvalidRelation(err),
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Point lookup + full-row write over one entity type.
///
/// `save` is an unconditional insert-or-replace: it never checks what the
/// row looked like before. Implementations must be safe to share between
/// concurrent callers without extra locking.
#[async_trait]
pub trait RowStore<T>: Send + Sync
where
    T: Send + 'static,
{
    type Key: Clone + Debug + Display + Send + Sync + 'static;

    async fn find_by_key(&self, key: &Self::Key) -> StoreResult<Option<T>>;

    /// Writes the whole row and returns the persisted value.
    async fn save(&self, entity: T) -> StoreResult<T>;

    /// Returns whether a row was removed.
    async fn delete_by_key(&self, key: &Self::Key) -> StoreResult<bool>;

    async fn exists_by_key(&self, key: &Self::Key) -> StoreResult<bool> {
        Ok(self.find_by_key(key).await?.is_some())
    }
}

/// Store whose rows are partitioned by owner.
#[async_trait]
pub trait OwnerScopedStore<T>: RowStore<T>
where
    T: Send + 'static,
{
    /// Returns every row of the owner partition ordered by member id.
    async fn find_all_by_owner(&self, owner_id: OwnerId) -> StoreResult<Vec<T>>;
}
