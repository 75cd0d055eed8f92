//! Tagged result of an upsert.
//!
//! # Invariants
//! - The variant reflects which branch of the upsert actually ran.
//! - The payload is the value returned by the store after the write, never
//!   the caller's input.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Which branch of an upsert executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataState {
    Created,
    Updated,
}

impl Display for DataState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
        }
    }
}

/// Persisted entity tagged with the upsert branch that produced it.
///
/// Serialized adjacently tagged: `{"state": "created", "entity": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "entity", rename_all = "snake_case")]
pub enum DomainDataState<T> {
    /// No row existed; the fallback entity was inserted.
    Created(T),
    /// A row existed; it was mutated and written back.
    Updated(T),
}

impl<T> DomainDataState<T> {
    pub fn state(&self) -> DataState {
        match self {
            Self::Created(_) => DataState::Created,
            Self::Updated(_) => DataState::Updated,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }

    pub fn entity(&self) -> &T {
        match self {
            Self::Created(entity) | Self::Updated(entity) => entity,
        }
    }

    pub fn into_entity(self) -> T {
        match self {
            Self::Created(entity) | Self::Updated(entity) => entity,
        }
    }

    pub fn into_parts(self) -> (DataState, T) {
        let state = self.state();
        (state, self.into_entity())
    }

    /// Transforms the payload while keeping the tag.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DomainDataState<U> {
        match self {
            Self::Created(entity) => DomainDataState::Created(f(entity)),
            Self::Updated(entity) => DomainDataState::Updated(f(entity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataState, DomainDataState};

    #[test]
    fn map_keeps_state_tag() {
        let created = DomainDataState::Created(2).map(|value| value * 10);
        assert_eq!(created, DomainDataState::Created(20));

        let updated = DomainDataState::Updated("a").map(str::len);
        assert_eq!(updated.into_parts(), (DataState::Updated, 1));
    }

    #[test]
    fn serializes_adjacently_tagged() {
        let json = serde_json::to_value(DomainDataState::Updated(7)).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "updated", "entity": 7 }));
        assert_eq!(DataState::Created.to_string(), "created");
    }
}
