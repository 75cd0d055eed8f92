use relation_core::{
    InvalidRelationError, ManyRelationConverter, MemberId, NativeKey, OwnerId, Relation,
    RelationIdentifierConverter, RelationKey, RelationKind, RelationRecord,
};
use uuid::Uuid;

/// Relation owned by a space inside a workspace: the owner is the pair.
struct WorkspaceSpaceRelation {
    workspace_id: Uuid,
    space_id: Option<OwnerId>,
    entity_id: Option<MemberId>,
}

impl Relation for WorkspaceSpaceRelation {
    fn owner_id(&self) -> Option<OwnerId> {
        self.space_id
    }

    fn member_id(&self) -> Option<MemberId> {
        self.entity_id
    }
}

/// Tuple-keyed converter whose owner carries the workspace as well.
struct WorkspaceScopedConverter;

impl RelationIdentifierConverter<WorkspaceSpaceRelation> for WorkspaceScopedConverter {
    type NativeKey = (OwnerId, MemberId);
    type OwnerId = (Uuid, OwnerId);

    fn to_native_key(&self, owner_id: OwnerId, member_id: MemberId) -> (OwnerId, MemberId) {
        (owner_id, member_id)
    }

    fn convert_from_native(
        &self,
        key: &(OwnerId, MemberId),
    ) -> Result<RelationKey, InvalidRelationError> {
        Ok(RelationKey::new(key.0, key.1))
    }

    fn convert_to_owner(
        &self,
        relation: &WorkspaceSpaceRelation,
    ) -> Result<(Uuid, OwnerId), InvalidRelationError> {
        let space_id = relation.space_id.ok_or(InvalidRelationError::MissingOwner)?;
        Ok((relation.workspace_id, space_id))
    }
}

#[test]
fn decoded_key_matches_relation_identifiers() {
    let relation = RelationRecord::new(Uuid::new_v4(), Uuid::new_v4(), RelationKind::SpaceEntity);

    let native: NativeKey =
        RelationIdentifierConverter::<RelationRecord>::convert(&ManyRelationConverter, &relation)
            .unwrap();
    let decoded = RelationIdentifierConverter::<RelationRecord>::convert_from_native(
        &ManyRelationConverter,
        &native,
    )
    .unwrap();

    assert_eq!(decoded, relation.relation_key().unwrap());
    assert_eq!(
        RelationIdentifierConverter::<RelationRecord>::convert_to_owner(
            &ManyRelationConverter,
            &relation
        )
        .unwrap(),
        decoded.owner_id
    );
}

#[test]
fn native_key_columns_use_storage_names() {
    let owner = Uuid::from_u128(7);
    let member = Uuid::from_u128(8);
    let native = NativeKey::from(RelationKey::new(owner, member));

    let columns: Vec<_> = native.columns().collect();
    assert_eq!(columns, vec![("childId", member), ("parentId", owner)]);
}

#[test]
fn custom_converter_plugs_in_other_key_shapes() {
    let converter = WorkspaceScopedConverter;
    let workspace_id = Uuid::new_v4();
    let space_id = Uuid::new_v4();
    let entity_id = Uuid::new_v4();
    let relation = WorkspaceSpaceRelation {
        workspace_id,
        space_id: Some(space_id),
        entity_id: Some(entity_id),
    };

    let native = converter.convert(&relation).unwrap();
    assert_eq!(native, (space_id, entity_id));
    assert_eq!(
        converter.convert_from_native(&native).unwrap(),
        RelationKey::new(space_id, entity_id)
    );
    assert_eq!(
        converter.convert_to_owner(&relation).unwrap(),
        (workspace_id, space_id)
    );
}

#[test]
fn custom_converter_rejects_relation_without_member() {
    let relation = WorkspaceSpaceRelation {
        workspace_id: Uuid::new_v4(),
        space_id: Some(Uuid::new_v4()),
        entity_id: None,
    };

    assert_eq!(
        WorkspaceScopedConverter.convert(&relation),
        Err(InvalidRelationError::MissingMember)
    );
}
