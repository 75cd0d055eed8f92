//! Expiring per-identifier data locks.
//!
//! Upserts give no mutual exclusion between concurrent writers of the same
//! key. Callers that need a single writer per identifier take a lock here
//! first and release it once their write completed.
//!
//! # Invariants
//! - Acquisition is one conditional statement: insert when absent, take
//!   over only when the previous holder's lock has expired.
//! - A lock that was never released frees itself after its TTL.

use crate::db::Database;
use crate::repo::{StoreError, StoreResult};
use async_trait::async_trait;
use log::debug;
use rusqlite::params;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

#[async_trait]
pub trait DataLock: Send + Sync {
    /// Tries to take the lock on `id` for `ttl`; returns whether it was taken.
    async fn lock(&self, id: Uuid, ttl: Duration) -> StoreResult<bool>;

    /// Releases the lock on `id`; returns whether a lock row existed.
    async fn unlock(&self, id: Uuid) -> StoreResult<bool>;
}

/// Lock table stored next to the relation data.
#[derive(Clone)]
pub struct SqliteDataLock {
    db: Database,
}

impl SqliteDataLock {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DataLock for SqliteDataLock {
    async fn lock(&self, id: Uuid, ttl: Duration) -> StoreResult<bool> {
        let now_ms = epoch_millis(SystemTime::now())?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_ms.saturating_add(ttl_ms);

        let acquired = self
            .db
            .with_conn(move |conn| -> StoreResult<bool> {
                let changed = conn.execute(
                    "INSERT INTO data_locks (id, expires_at) VALUES (?1, ?2)
                     ON CONFLICT (id) DO UPDATE SET expires_at = excluded.expires_at
                     WHERE data_locks.expires_at <= ?3;",
                    params![id.to_string(), expires_at, now_ms],
                )?;
                Ok(changed == 1)
            })
            .await?;

        debug!("event=data_lock module=lock status=ok acquired={acquired} ttl_ms={ttl_ms}");
        Ok(acquired)
    }

    async fn unlock(&self, id: Uuid) -> StoreResult<bool> {
        self.db
            .with_conn(move |conn| -> StoreResult<bool> {
                let changed =
                    conn.execute("DELETE FROM data_locks WHERE id = ?1;", [id.to_string()])?;
                Ok(changed > 0)
            })
            .await
    }
}

/// In-process lock table with the same take-over rules.
///
/// A deadline past what `Instant` can represent is stored as `None` and
/// never expires, mirroring the saturated deadline of the SQLite table.
#[derive(Default)]
pub struct MemoryDataLock {
    locks: Mutex<HashMap<Uuid, Option<Instant>>>,
}

impl MemoryDataLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataLock for MemoryDataLock {
    async fn lock(&self, id: Uuid, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| StoreError::Poisoned("data lock"))?;
        let held = locks
            .get(&id)
            .is_some_and(|expires_at| !matches!(expires_at, Some(at) if *at <= now));
        if held {
            return Ok(false);
        }
        locks.insert(id, now.checked_add(ttl));
        Ok(true)
    }

    async fn unlock(&self, id: Uuid) -> StoreResult<bool> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| StoreError::Poisoned("data lock"))?;
        Ok(locks.remove(&id).is_some())
    }
}

fn epoch_millis(at: SystemTime) -> StoreResult<i64> {
    let elapsed = at
        .duration_since(UNIX_EPOCH)
        .map_err(|err| StoreError::InvalidData(format!("system clock before unix epoch: {err}")))?;
    Ok(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
