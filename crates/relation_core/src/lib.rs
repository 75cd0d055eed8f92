//! Relation storage core.
//!
//! Upsert-by-key over partitioned row stores, and the owner/member relation
//! model that maps onto their composite keys. This crate is the single
//! source of truth for relation invariants.

pub mod config;
pub mod convert;
pub mod db;
pub mod lock;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LockConfig};
pub use convert::native_key::{NativeKey, CHILD_ID_COLUMN, PARENT_ID_COLUMN};
pub use convert::relation_converter::{ManyRelationConverter, RelationIdentifierConverter};
pub use db::{Database, DbError};
pub use lock::{DataLock, MemoryDataLock, SqliteDataLock};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::relation::{
    InvalidRelationError, MemberId, OwnerId, Relation, RelationKey, RelationKind, RelationRecord,
};
pub use model::resource::{Resource, ResourceId, ResourceValidationError};
pub use model::state::{DataState, DomainDataState};
pub use repo::memory_store::MemoryStore;
pub use repo::relation_repo::SqliteRelationRepository;
pub use repo::resource_repo::SqliteResourceRepository;
pub use repo::upsert::UpsertRepository;
pub use repo::{OwnerScopedStore, RepoError, RepoResult, RowStore, StoreError, StoreResult};
pub use service::relation_service::{MemberInfo, RelationService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
