//! Native composite key of the relation store.
//!
//! The store addresses relation rows with a column-name → UUID map holding
//! exactly two entries: `parentId` (partition) and `childId` (clustering).
//! Keys built here are always well formed; keys arriving from outside (e.g.
//! deserialized from a request) are validated by [`NativeKey::decode`].

use crate::model::relation::{InvalidRelationError, MemberId, OwnerId, RelationKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Partition column of the relation store.
pub const PARENT_ID_COLUMN: &str = "parentId";
/// Clustering column of the relation store.
pub const CHILD_ID_COLUMN: &str = "childId";

/// Column-name keyed identifier map as understood by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeKey(BTreeMap<String, Uuid>);

impl NativeKey {
    /// Builds the two-column key for an owner/member pair.
    pub fn composite(parent_id: OwnerId, child_id: MemberId) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(PARENT_ID_COLUMN.to_string(), parent_id);
        columns.insert(CHILD_ID_COLUMN.to_string(), child_id);
        Self(columns)
    }

    /// Wraps raw columns without validation.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Uuid)>,
        S: Into<String>,
    {
        Self(
            columns
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn get(&self, column: &str) -> Option<Uuid> {
        self.0.get(column).copied()
    }

    pub fn parent_id(&self) -> Option<OwnerId> {
        self.get(PARENT_ID_COLUMN)
    }

    pub fn child_id(&self) -> Option<MemberId> {
        self.get(CHILD_ID_COLUMN)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, Uuid)> + '_ {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Recovers the owner/member pair.
    ///
    /// # Errors
    /// - `UnexpectedColumn` when any column besides `parentId`/`childId` is set.
    /// - `MissingColumn` when either of the two columns is absent.
    pub fn decode(&self) -> Result<RelationKey, InvalidRelationError> {
        if let Some(name) = self
            .0
            .keys()
            .find(|name| name.as_str() != PARENT_ID_COLUMN && name.as_str() != CHILD_ID_COLUMN)
        {
            return Err(InvalidRelationError::UnexpectedColumn(name.clone()));
        }
        let owner_id = self
            .parent_id()
            .ok_or(InvalidRelationError::MissingColumn(PARENT_ID_COLUMN))?;
        let member_id = self
            .child_id()
            .ok_or(InvalidRelationError::MissingColumn(CHILD_ID_COLUMN))?;
        Ok(RelationKey::new(owner_id, member_id))
    }
}

impl From<RelationKey> for NativeKey {
    fn from(key: RelationKey) -> Self {
        Self::composite(key.owner_id, key.member_id)
    }
}

impl Display for NativeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::{NativeKey, CHILD_ID_COLUMN, PARENT_ID_COLUMN};
    use crate::model::relation::{InvalidRelationError, RelationKey};
    use uuid::Uuid;

    #[test]
    fn composite_places_owner_in_partition_column() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let key = NativeKey::composite(owner, member);

        assert_eq!(key.len(), 2);
        assert_eq!(key.get(PARENT_ID_COLUMN), Some(owner));
        assert_eq!(key.get(CHILD_ID_COLUMN), Some(member));
        assert_eq!(key.decode().unwrap(), RelationKey::new(owner, member));
    }

    #[test]
    fn decode_rejects_extra_and_missing_columns() {
        let owner = Uuid::new_v4();
        let extra = NativeKey::from_columns([
            (PARENT_ID_COLUMN, owner),
            (CHILD_ID_COLUMN, Uuid::new_v4()),
            ("relation", Uuid::new_v4()),
        ]);
        assert_eq!(
            extra.decode(),
            Err(InvalidRelationError::UnexpectedColumn("relation".to_string()))
        );

        let missing = NativeKey::from_columns([(PARENT_ID_COLUMN, owner)]);
        assert_eq!(
            missing.decode(),
            Err(InvalidRelationError::MissingColumn(CHILD_ID_COLUMN))
        );
    }

    #[test]
    fn deserializes_from_plain_json_map() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let json = format!(r#"{{"parentId":"{owner}","childId":"{member}"}}"#);

        let key: NativeKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, NativeKey::composite(owner, member));
    }
}
