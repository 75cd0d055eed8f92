//! In-process `RowStore` backed by a hash map.
//!
//! # Responsibility
//! - Provide a store with the same overwrite semantics as the SQLite
//!   repositories, for tests and embedded callers.
//! - Expose fault injection and access counters so callers can observe
//!   exactly how many reads and writes an operation issued.
//!
//! # Invariants
//! - `save` replaces the whole row atomically under the map lock.
//! - Counters count attempted operations, including injected failures.

use crate::convert::native_key::NativeKey;
use crate::model::relation::{OwnerId, Relation, RelationRecord};
use crate::model::resource::{Resource, ResourceId};
use crate::repo::{OwnerScopedStore, RowStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type KeyFn<K, T> = fn(&T) -> StoreResult<K>;

/// Hash-map store keyed by `K`, deriving keys from entities through `key_of`.
pub struct MemoryStore<K, T> {
    rows: Arc<Mutex<HashMap<K, T>>>,
    key_of: KeyFn<K, T>,
    reads_failing: AtomicBool,
    writes_failing: AtomicBool,
    lookup_delay_ms: AtomicU64,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore<ResourceId, Resource> {
    /// Store for scalar-keyed resources.
    pub fn resources() -> Self {
        Self::with_key_fn(|resource| {
            resource.validate()?;
            Ok(resource.id)
        })
    }
}

impl MemoryStore<NativeKey, RelationRecord> {
    /// Store for relation records keyed by their native composite key.
    pub fn relations() -> Self {
        Self::with_key_fn(|relation| Ok(NativeKey::from(relation.relation_key()?)))
    }
}

impl<K, T> MemoryStore<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    pub fn with_key_fn(key_of: KeyFn<K, T>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            key_of,
            reads_failing: AtomicBool::new(false),
            writes_failing: AtomicBool::new(false),
            lookup_delay_ms: AtomicU64::new(0),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Makes every following lookup fail as if the store were unreachable.
    pub fn set_reads_failing(&self, failing: bool) {
        self.reads_failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every following write or delete fail.
    pub fn set_writes_failing(&self, failing: bool) {
        self.writes_failing.store(failing, Ordering::SeqCst);
    }

    /// Holds each lookup result for `delay` before returning it.
    ///
    /// Widens the window between lookup and write so races become
    /// reproducible.
    pub fn set_lookup_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.lookup_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map_or(0, |rows| rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seeds a row without touching counters or fault flags.
    pub fn seed(&self, entity: T) -> StoreResult<()> {
        let key = (self.key_of)(&entity)?;
        self.lock_rows()?.insert(key, entity);
        Ok(())
    }

    fn lock_rows(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<K, T>>> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Poisoned("memory store"))
    }

    fn begin_write(&self) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.writes_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Offline("memory store rejected write".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<K, T> RowStore<T> for MemoryStore<K, T>
where
    K: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Key = K;

    async fn find_by_key(&self, key: &K) -> StoreResult<Option<T>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.reads_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Offline("memory store unreachable".to_string()));
        }
        let found = self.lock_rows()?.get(key).cloned();

        let delay_ms = self.lookup_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        Ok(found)
    }

    async fn save(&self, entity: T) -> StoreResult<T> {
        self.begin_write()?;
        let key = (self.key_of)(&entity)?;
        self.lock_rows()?.insert(key, entity.clone());
        Ok(entity)
    }

    async fn delete_by_key(&self, key: &K) -> StoreResult<bool> {
        self.begin_write()?;
        Ok(self.lock_rows()?.remove(key).is_some())
    }
}

#[async_trait]
impl<K, T> OwnerScopedStore<T> for MemoryStore<K, T>
where
    K: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static,
    T: Relation + Clone + Send + Sync + 'static,
{
    async fn find_all_by_owner(&self, owner_id: OwnerId) -> StoreResult<Vec<T>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.reads_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Offline("memory store unreachable".to_string()));
        }
        let mut partition: Vec<T> = self
            .lock_rows()?
            .values()
            .filter(|row| row.owner_id() == Some(owner_id))
            .cloned()
            .collect();
        partition.sort_by_key(|row| row.member_id());
        Ok(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::model::relation::{RelationKind, RelationRecord};
    use crate::repo::{OwnerScopedStore, RowStore, StoreError};
    use uuid::Uuid;

    #[tokio::test]
    async fn save_rejects_relation_without_member() {
        let store = MemoryStore::relations();
        let mut relation = RelationRecord::detached(RelationKind::SpaceEntity);
        relation.owner_id = Some(Uuid::new_v4());

        let err = store.save(relation).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRelation(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn owner_partition_is_sorted_by_member() {
        let store = MemoryStore::relations();
        let owner = Uuid::from_u128(1);
        let other_owner = Uuid::from_u128(2);
        for member in [30_u128, 10, 20] {
            store
                .save(RelationRecord::new(
                    owner,
                    Uuid::from_u128(member),
                    RelationKind::PrototypeProperty,
                ))
                .await
                .unwrap();
        }
        store
            .save(RelationRecord::new(
                other_owner,
                Uuid::from_u128(5),
                RelationKind::PrototypeProperty,
            ))
            .await
            .unwrap();

        let members: Vec<_> = store
            .find_all_by_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|relation| relation.member_id)
            .collect();
        assert_eq!(
            members,
            vec![Uuid::from_u128(10), Uuid::from_u128(20), Uuid::from_u128(30)]
        );
    }
}
