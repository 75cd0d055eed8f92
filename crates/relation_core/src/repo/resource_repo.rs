//! SQLite-backed resource store.
//!
//! # Responsibility
//! - Persist scalar-keyed resources (relation owners and members).
//!
//! # Invariants
//! - Write paths call `Resource::validate()` before any statement runs.
//! - `save` is a single unconditional insert-or-replace statement.

use crate::db::Database;
use crate::model::resource::{Resource, ResourceId};
use crate::repo::{RowStore, StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Row};
use uuid::Uuid;

/// Resource store over a shared SQLite session.
#[derive(Clone)]
pub struct SqliteResourceRepository {
    db: Database,
}

impl SqliteResourceRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RowStore<Resource> for SqliteResourceRepository {
    type Key = ResourceId;

    async fn find_by_key(&self, key: &ResourceId) -> StoreResult<Option<Resource>> {
        let id = key.to_string();
        self.db
            .with_conn(move |conn| -> StoreResult<Option<Resource>> {
                let mut stmt = conn.prepare(
                    "SELECT id, name, revision
                     FROM resources
                     WHERE id = ?1;",
                )?;
                let mut rows = stmt.query([id.as_str()])?;
                if let Some(row) = rows.next()? {
                    return Ok(Some(parse_resource_row(row)?));
                }
                Ok(None)
            })
            .await
    }

    async fn save(&self, entity: Resource) -> StoreResult<Resource> {
        entity.validate()?;
        let row = entity.clone();

        self.db
            .with_conn(move |conn| -> StoreResult<()> {
                conn.execute(
                    "INSERT INTO resources (id, name, revision)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (id) DO UPDATE SET
                        name = excluded.name,
                        revision = excluded.revision,
                        updated_at = (strftime('%s', 'now') * 1000);",
                    params![row.id.to_string(), row.name.as_str(), row.revision],
                )?;
                Ok(())
            })
            .await?;

        Ok(entity)
    }

    async fn delete_by_key(&self, key: &ResourceId) -> StoreResult<bool> {
        let id = key.to_string();
        self.db
            .with_conn(move |conn| -> StoreResult<bool> {
                let changed = conn.execute("DELETE FROM resources WHERE id = ?1;", [id.as_str()])?;
                Ok(changed > 0)
            })
            .await
    }
}

fn parse_resource_row(row: &Row<'_>) -> StoreResult<Resource> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{id_text}` in resources.id"))
    })?;

    let resource = Resource {
        id,
        name: row.get("name")?,
        revision: row.get("revision")?,
    };
    resource
        .validate()
        .map_err(|err| StoreError::InvalidData(format!("resource {id}: {err}")))?;
    Ok(resource)
}
