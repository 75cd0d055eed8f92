//! Owner/member relation use-cases.
//!
//! # Responsibility
//! - Create relations only under owners that exist.
//! - Resolve an owner's members, purging relations whose member is gone.
//! - Route relation upserts through the identifier converter so callers
//!   never build store keys themselves.
//!
//! # Invariants
//! - Relation keys are derived before any storage access; an incomplete
//!   relation fails with `InvalidRelation` without touching a store.
//! - `connect_to_owner` writes the relation row only when it is absent.

use crate::convert::relation_converter::{ManyRelationConverter, RelationIdentifierConverter};
use crate::model::relation::{InvalidRelationError, Relation};
use crate::model::resource::{Resource, ResourceId};
use crate::model::state::DomainDataState;
use crate::repo::upsert::UpsertRepository;
use crate::repo::{OwnerScopedStore, RepoError, RepoResult, RowStore};
use log::{info, warn};
use std::marker::PhantomData;

/// A relation together with the member it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo<T> {
    pub relation: T,
    pub member: Resource,
}

/// Relation service over owner, member and relation stores.
pub struct RelationService<T, P, M, R, V = ManyRelationConverter> {
    owners: P,
    members: M,
    relations: R,
    converter: V,
    _relation: PhantomData<fn() -> T>,
}

impl<T, P, M, R> RelationService<T, P, M, R, ManyRelationConverter> {
    /// Creates a service using the scalar-owner converter.
    pub fn new(owners: P, members: M, relations: R) -> Self {
        Self::with_converter(owners, members, relations, ManyRelationConverter)
    }
}

impl<T, P, M, R, V> RelationService<T, P, M, R, V> {
    pub fn with_converter(owners: P, members: M, relations: R, converter: V) -> Self {
        Self {
            owners,
            members,
            relations,
            converter,
            _relation: PhantomData,
        }
    }

    pub fn owners(&self) -> &P {
        &self.owners
    }

    pub fn members(&self) -> &M {
        &self.members
    }

    pub fn relations(&self) -> &R {
        &self.relations
    }
}

impl<T, P, M, R, V> RelationService<T, P, M, R, V>
where
    T: Relation + Clone + Send + Sync + 'static,
    P: RowStore<Resource, Key = ResourceId>,
    M: RowStore<Resource, Key = ResourceId>,
    R: OwnerScopedStore<T>,
    V: RelationIdentifierConverter<T, NativeKey = R::Key, OwnerId = ResourceId>,
{
    /// Saves `relation` after checking that its owner exists.
    ///
    /// # Errors
    /// - `InvalidRelation` when either identifier is missing.
    /// - `NotFound` when the owner does not exist.
    pub async fn create(&self, relation: T) -> RepoResult<T> {
        self.converter.convert(&relation)?;
        let owner_id = self.converter.convert_to_owner(&relation)?;

        let owner_exists = self
            .owners
            .exists_by_key(&owner_id)
            .await
            .map_err(RepoError::from_lookup)?;
        if !owner_exists {
            return Err(RepoError::not_found("owner", owner_id));
        }

        let created = self
            .relations
            .save(relation)
            .await
            .map_err(RepoError::from_write)?;
        info!("event=relation_create module=service status=ok owner_id={owner_id}");
        Ok(created)
    }

    /// Creates the relation, then persists the member it points at.
    pub async fn create_with_member(
        &self,
        relation: T,
        member: Resource,
    ) -> RepoResult<MemberInfo<T>> {
        let key = relation.relation_key()?;
        if key.member_id != member.id {
            return Err(InvalidRelationError::MemberMismatch {
                expected: key.member_id,
                actual: member.id,
            }
            .into());
        }
        member.validate()?;

        let relation = self.create(relation).await?;
        let member = self
            .members
            .save(member)
            .await
            .map_err(RepoError::from_write)?;
        Ok(MemberInfo { relation, member })
    }

    /// Returns every relation of `owner_id`, ordered by member id.
    pub async fn relations_by_owner(&self, owner_id: ResourceId) -> RepoResult<Vec<T>> {
        self.relations
            .find_all_by_owner(owner_id)
            .await
            .map_err(RepoError::from_lookup)
    }

    /// Looks a relation up by a native key received from outside core.
    pub async fn get_by_key(&self, key: &V::NativeKey) -> RepoResult<Option<T>> {
        self.converter.convert_from_native(key)?;
        self.relations
            .find_by_key(key)
            .await
            .map_err(RepoError::from_lookup)
    }

    /// Upserts the relation addressed by `relation`'s identifiers.
    pub async fn update_or_create<F>(
        &self,
        relation: &T,
        mutate: F,
        fallback: T,
    ) -> RepoResult<DomainDataState<T>>
    where
        F: FnOnce(&mut T) + Send,
    {
        let key = self.converter.convert(relation)?;
        self.relations.update_or_create(key, mutate, fallback).await
    }

    /// Resolves the members of `owner_id`.
    ///
    /// Relations whose member no longer exists are deleted and skipped.
    pub async fn members_by_owner(&self, owner_id: ResourceId) -> RepoResult<Vec<MemberInfo<T>>> {
        let relations = self.relations_by_owner(owner_id).await?;
        let mut resolved = Vec::with_capacity(relations.len());

        for relation in relations {
            let key = relation.relation_key()?;
            let member = self
                .members
                .find_by_key(&key.member_id)
                .await
                .map_err(RepoError::from_lookup)?;
            match member {
                Some(member) => resolved.push(MemberInfo { relation, member }),
                None => self.purge(&relation).await?,
            }
        }

        Ok(resolved)
    }

    /// Links an existing member to an existing owner and returns the member.
    ///
    /// # Errors
    /// - `NotFound` for a missing owner or a missing member.
    pub async fn connect_to_owner(&self, relation: T) -> RepoResult<Resource> {
        let native_key = self.converter.convert(&relation)?;
        let owner_id = self.converter.convert_to_owner(&relation)?;
        let member_id = relation.relation_key()?.member_id;

        let owner_exists = self
            .owners
            .exists_by_key(&owner_id)
            .await
            .map_err(RepoError::from_lookup)?;
        if !owner_exists {
            return Err(RepoError::not_found("owner", owner_id));
        }

        let member = self
            .members
            .find_by_key(&member_id)
            .await
            .map_err(RepoError::from_lookup)?
            .ok_or_else(|| RepoError::not_found("member", member_id))?;

        let linked = self
            .relations
            .exists_by_key(&native_key)
            .await
            .map_err(RepoError::from_lookup)?;
        if !linked {
            self.relations
                .save(relation)
                .await
                .map_err(RepoError::from_write)?;
            info!("event=relation_connect module=service status=ok owner_id={owner_id}");
        }

        Ok(member)
    }

    async fn purge(&self, relation: &T) -> RepoResult<()> {
        let key = self.converter.convert(relation)?;
        self.relations
            .delete_by_key(&key)
            .await
            .map_err(RepoError::from_write)?;
        warn!("event=relation_purge module=service status=ok reason=member_missing key={key}");
        Ok(())
    }
}
