//! SQLite-backed relation store.
//!
//! # Responsibility
//! - Persist relation records in the `relations` table, addressed by the
//!   native composite key (`parentId` partition, `childId` clustering).
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Keys are decoded before any statement runs; a malformed key never
//!   reaches SQLite.
//! - `save` is a single unconditional insert-or-replace statement.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::convert::native_key::NativeKey;
use crate::db::Database;
use crate::model::relation::{OwnerId, Relation, RelationKey, RelationKind, RelationRecord};
use crate::repo::{OwnerScopedStore, RowStore, StoreError, StoreResult};
use async_trait::async_trait;
use rusqlite::{params, Row};
use uuid::Uuid;

const RELATION_SELECT_SQL: &str = "SELECT
    parent_id,
    child_id,
    kind,
    label,
    revision
FROM relations";

/// Relation store over a shared SQLite session.
#[derive(Clone)]
pub struct SqliteRelationRepository {
    db: Database,
}

impl SqliteRelationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RowStore<RelationRecord> for SqliteRelationRepository {
    type Key = NativeKey;

    async fn find_by_key(&self, key: &NativeKey) -> StoreResult<Option<RelationRecord>> {
        let RelationKey {
            owner_id,
            member_id,
        } = key.decode()?;

        self.db
            .with_conn(move |conn| -> StoreResult<Option<RelationRecord>> {
                let mut stmt = conn.prepare(&format!(
                    "{RELATION_SELECT_SQL}
                     WHERE parent_id = ?1
                       AND child_id = ?2;"
                ))?;
                let mut rows = stmt.query(params![owner_id.to_string(), member_id.to_string()])?;
                if let Some(row) = rows.next()? {
                    return Ok(Some(parse_relation_row(row)?));
                }
                Ok(None)
            })
            .await
    }

    async fn save(&self, entity: RelationRecord) -> StoreResult<RelationRecord> {
        let key = entity.relation_key()?;
        let row = entity.clone();

        self.db
            .with_conn(move |conn| -> StoreResult<()> {
                conn.execute(
                    "INSERT INTO relations (
                        parent_id,
                        child_id,
                        kind,
                        label,
                        revision
                    ) VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT (parent_id, child_id) DO UPDATE SET
                        kind = excluded.kind,
                        label = excluded.label,
                        revision = excluded.revision,
                        updated_at = (strftime('%s', 'now') * 1000);",
                    params![
                        key.owner_id.to_string(),
                        key.member_id.to_string(),
                        relation_kind_to_db(row.kind),
                        row.label.as_str(),
                        row.revision,
                    ],
                )?;
                Ok(())
            })
            .await?;

        Ok(entity)
    }

    async fn delete_by_key(&self, key: &NativeKey) -> StoreResult<bool> {
        let RelationKey {
            owner_id,
            member_id,
        } = key.decode()?;

        self.db
            .with_conn(move |conn| -> StoreResult<bool> {
                let changed = conn.execute(
                    "DELETE FROM relations WHERE parent_id = ?1 AND child_id = ?2;",
                    params![owner_id.to_string(), member_id.to_string()],
                )?;
                Ok(changed > 0)
            })
            .await
    }
}

#[async_trait]
impl OwnerScopedStore<RelationRecord> for SqliteRelationRepository {
    async fn find_all_by_owner(&self, owner_id: OwnerId) -> StoreResult<Vec<RelationRecord>> {
        self.db
            .with_conn(move |conn| -> StoreResult<Vec<RelationRecord>> {
                let mut stmt = conn.prepare(&format!(
                    "{RELATION_SELECT_SQL}
                     WHERE parent_id = ?1
                     ORDER BY child_id ASC;"
                ))?;
                let mut rows = stmt.query([owner_id.to_string()])?;
                let mut relations = Vec::new();
                while let Some(row) = rows.next()? {
                    relations.push(parse_relation_row(row)?);
                }
                Ok(relations)
            })
            .await
    }
}

fn parse_relation_row(row: &Row<'_>) -> StoreResult<RelationRecord> {
    let parent_id = parse_uuid_column(row, "parent_id")?;
    let child_id = parse_uuid_column(row, "child_id")?;

    let kind_text: String = row.get("kind")?;
    let kind = parse_relation_kind(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid relation kind `{kind_text}` in relations.kind"))
    })?;

    Ok(RelationRecord {
        owner_id: Some(parent_id),
        member_id: Some(child_id),
        kind,
        label: row.get("label")?,
        revision: row.get("revision")?,
    })
}

fn parse_uuid_column(row: &Row<'_>, column: &str) -> StoreResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{text}` in relations.{column}"))
    })
}

fn relation_kind_to_db(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::DictionaryInstance => "dictionary_instance",
        RelationKind::PrototypeProperty => "prototype_property",
        RelationKind::InstanceSpace => "instance_space",
        RelationKind::SpaceEntity => "space_entity",
        RelationKind::CategoryHierarchy => "category_hierarchy",
    }
}

fn parse_relation_kind(value: &str) -> Option<RelationKind> {
    match value {
        "dictionary_instance" => Some(RelationKind::DictionaryInstance),
        "prototype_property" => Some(RelationKind::PrototypeProperty),
        "instance_space" => Some(RelationKind::InstanceSpace),
        "space_entity" => Some(RelationKind::SpaceEntity),
        "category_hierarchy" => Some(RelationKind::CategoryHierarchy),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_relation_kind, relation_kind_to_db};
    use crate::model::relation::RelationKind;

    #[test]
    fn relation_kind_db_names_are_reversible() {
        for kind in [
            RelationKind::DictionaryInstance,
            RelationKind::PrototypeProperty,
            RelationKind::InstanceSpace,
            RelationKind::SpaceEntity,
            RelationKind::CategoryHierarchy,
        ] {
            assert_eq!(parse_relation_kind(relation_kind_to_db(kind)), Some(kind));
        }
        assert_eq!(parse_relation_kind("unknown"), None);
    }
}
