//! Relation domain model.
//!
//! # Responsibility
//! - Define the two-part ownership key (`RelationKey`).
//! - Define the capability every stored relation exposes (`Relation`).
//! - Provide the canonical stored relation record (`RelationRecord`).
//!
//! # Invariants
//! - `RelationKey` is immutable once built and always orders its parts as
//!   `(owner, member)`.
//! - `owner_id` is the partition key; `member_id` is the clustering key.
//! - A relation missing either identifier cannot be converted to a key.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of the entity that owns a relation (partition key).
pub type OwnerId = Uuid;

/// Identifier of the owned entity (clustering key within the owner partition).
pub type MemberId = Uuid;

/// Raised when a relation cannot be turned into a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRelationError {
    #[error("relation is missing its owner identifier")]
    MissingOwner,
    #[error("relation is missing its member identifier")]
    MissingMember,
    #[error("relation key is missing column `{0}`")]
    MissingColumn(&'static str),
    #[error("relation key has unexpected column `{0}`")]
    UnexpectedColumn(String),
    #[error("relation points at member {expected} but member {actual} was supplied")]
    MemberMismatch { expected: MemberId, actual: MemberId },
}

/// Two-part ownership key.
///
/// Ordering is `(owner_id, member_id)`, which matches how rows are laid out
/// in storage: grouped by owner, sorted by member inside each owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationKey {
    pub owner_id: OwnerId,
    pub member_id: MemberId,
}

impl RelationKey {
    pub fn new(owner_id: OwnerId, member_id: MemberId) -> Self {
        Self {
            owner_id,
            member_id,
        }
    }
}

/// Capability of any entity modelling an "owner owns member" edge.
///
/// Identifiers are optional because relations are often assembled in steps
/// (e.g. the member id is assigned on creation). Conversion to a key is the
/// point where both must be present.
pub trait Relation {
    fn owner_id(&self) -> Option<OwnerId>;
    fn member_id(&self) -> Option<MemberId>;

    /// Returns the composite key, or the first missing part.
    fn relation_key(&self) -> Result<RelationKey, InvalidRelationError> {
        let owner_id = self.owner_id().ok_or(InvalidRelationError::MissingOwner)?;
        let member_id = self.member_id().ok_or(InvalidRelationError::MissingMember)?;
        Ok(RelationKey::new(owner_id, member_id))
    }
}

impl Relation for RelationKey {
    fn owner_id(&self) -> Option<OwnerId> {
        Some(self.owner_id)
    }

    fn member_id(&self) -> Option<MemberId> {
        Some(self.member_id)
    }
}

/// What an owner/member edge stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// A dictionary owning one of its instances.
    DictionaryInstance,
    /// A prototype owning one of its properties.
    PrototypeProperty,
    /// An instance owning a space deployed for it.
    InstanceSpace,
    /// A space owning one of its entities.
    SpaceEntity,
    /// A category owning a child category.
    CategoryHierarchy,
}

/// Canonical stored relation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
    #[serde(rename = "parentId")]
    pub owner_id: Option<OwnerId>,
    #[serde(rename = "childId")]
    pub member_id: Option<MemberId>,
    pub kind: RelationKind,
    /// Free-form display label; not part of the key.
    pub label: String,
    /// Incremented by callers on every in-place update they care to count.
    pub revision: i64,
}

impl RelationRecord {
    /// Creates a complete relation between `owner_id` and `member_id`.
    pub fn new(owner_id: OwnerId, member_id: MemberId, kind: RelationKind) -> Self {
        Self {
            owner_id: Some(owner_id),
            member_id: Some(member_id),
            kind,
            label: String::new(),
            revision: 0,
        }
    }

    /// Creates a relation whose identifiers are filled in later.
    pub fn detached(kind: RelationKind) -> Self {
        Self {
            owner_id: None,
            member_id: None,
            kind,
            label: String::new(),
            revision: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Attaches the relation to `owner_id` and `member_id`.
    pub fn attach(&mut self, owner_id: OwnerId, member_id: MemberId) {
        self.owner_id = Some(owner_id);
        self.member_id = Some(member_id);
    }

    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// Checks that both identifiers are present.
    pub fn validate(&self) -> Result<(), InvalidRelationError> {
        self.relation_key().map(|_| ())
    }
}

impl Relation for RelationRecord {
    fn owner_id(&self) -> Option<OwnerId> {
        self.owner_id
    }

    fn member_id(&self) -> Option<MemberId> {
        self.member_id
    }
}
