//! Relation entity ⇄ native key conversion.
//!
//! # Responsibility
//! - Derive the store key of a relation from its owner/member fields.
//! - Decode a store key back into its owner/member pair.
//! - Extract the owner identifier used to scope partition queries.
//!
//! # Invariants
//! - `convert_from_native(convert(r)) == r.relation_key()` for every valid `r`.
//! - `convert_to_owner(r)` equals the owner part of `convert(r)`.
//! - A relation missing either identifier never reaches storage.

use crate::convert::native_key::NativeKey;
use crate::model::relation::{InvalidRelationError, MemberId, OwnerId, Relation, RelationKey};

/// Converts a relation type to and from a store's native key.
///
/// `NativeKey` and `OwnerId` are associated so that a store with a different
/// key encoding, or a relation owned through a composite key, can plug in
/// without touching domain entities.
pub trait RelationIdentifierConverter<R: Relation + ?Sized>: Send + Sync {
    type NativeKey;
    type OwnerId;

    /// Builds the native key. Parts must stay in `(owner, member)` order.
    fn to_native_key(&self, owner_id: OwnerId, member_id: MemberId) -> Self::NativeKey;

    /// Decodes a native key back into its owner/member pair.
    fn convert_from_native(
        &self,
        key: &Self::NativeKey,
    ) -> Result<RelationKey, InvalidRelationError>;

    /// Returns the identifier of the relation's owner.
    fn convert_to_owner(&self, relation: &R) -> Result<Self::OwnerId, InvalidRelationError>;

    /// Derives the native key from the relation's identifiers.
    fn convert(&self, relation: &R) -> Result<Self::NativeKey, InvalidRelationError> {
        let key = relation.relation_key()?;
        Ok(self.to_native_key(key.owner_id, key.member_id))
    }
}

/// Converter for relations owned directly by a scalar owner id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyRelationConverter;

impl<R: Relation + ?Sized> RelationIdentifierConverter<R> for ManyRelationConverter {
    type NativeKey = NativeKey;
    type OwnerId = OwnerId;

    fn to_native_key(&self, owner_id: OwnerId, member_id: MemberId) -> NativeKey {
        NativeKey::composite(owner_id, member_id)
    }

    fn convert_from_native(&self, key: &NativeKey) -> Result<RelationKey, InvalidRelationError> {
        key.decode()
    }

    fn convert_to_owner(&self, relation: &R) -> Result<OwnerId, InvalidRelationError> {
        relation.owner_id().ok_or(InvalidRelationError::MissingOwner)
    }
}

#[cfg(test)]
mod tests {
    use super::{ManyRelationConverter, RelationIdentifierConverter};
    use crate::convert::native_key::{NativeKey, CHILD_ID_COLUMN, PARENT_ID_COLUMN};
    use crate::model::relation::{
        InvalidRelationError, OwnerId, Relation, RelationKind, RelationRecord,
    };
    use uuid::Uuid;

    #[test]
    fn convert_round_trips_through_decoder() {
        let converter = ManyRelationConverter;
        let relation = RelationRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RelationKind::PrototypeProperty,
        );

        let native = converter.convert(&relation).unwrap();
        let decoded =
            RelationIdentifierConverter::<RelationRecord>::convert_from_native(&converter, &native)
                .unwrap();

        assert_eq!(decoded, relation.relation_key().unwrap());
    }

    #[test]
    fn owner_matches_partition_column() {
        let converter = ManyRelationConverter;
        let relation = RelationRecord::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            RelationKind::DictionaryInstance,
        );

        let native = converter.convert(&relation).unwrap();
        let owner: OwnerId = converter.convert_to_owner(&relation).unwrap();

        assert_eq!(native.get(PARENT_ID_COLUMN), Some(owner));
        assert_eq!(native.get(CHILD_ID_COLUMN), relation.member_id);
    }

    #[test]
    fn convert_rejects_missing_member() {
        let mut relation = RelationRecord::detached(RelationKind::SpaceEntity);
        relation.owner_id = Some(Uuid::new_v4());

        let result: Result<NativeKey, _> = ManyRelationConverter.convert(&relation);
        assert_eq!(result, Err(InvalidRelationError::MissingMember));
    }

    #[test]
    fn to_native_key_is_deterministic() {
        fn native_key(owner: Uuid, member: Uuid) -> NativeKey {
            RelationIdentifierConverter::<RelationRecord>::to_native_key(
                &ManyRelationConverter,
                owner,
                member,
            )
        }

        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        assert_eq!(native_key(owner, member), native_key(owner, member));
        assert_ne!(native_key(owner, member), native_key(member, owner));
    }
}
