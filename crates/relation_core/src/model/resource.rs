//! Resource domain model.
//!
//! Owners and members of a relation are both resources: scalar-keyed rows
//! addressed by a single stable UUID.
//!
//! # Invariants
//! - `id` is stable and never reused for another resource.
//! - `name` is never blank.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier for a resource.
pub type ResourceId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceValidationError {
    #[error("resource name cannot be blank")]
    BlankName,
    #[error("resource revision cannot be negative, got {0}")]
    NegativeRevision(i64),
}

/// Scalar-keyed stored entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub revision: i64,
}

impl Resource {
    /// Creates a resource with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a resource with a caller-provided id.
    ///
    /// Used when identity is assigned outside core (imports, fixtures).
    pub fn with_id(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            revision: 0,
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.revision += 1;
    }

    pub fn validate(&self) -> Result<(), ResourceValidationError> {
        if self.name.trim().is_empty() {
            return Err(ResourceValidationError::BlankName);
        }
        if self.revision < 0 {
            return Err(ResourceValidationError::NegativeRevision(self.revision));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Resource, ResourceValidationError};

    #[test]
    fn rename_bumps_revision() {
        let mut resource = Resource::new("draft");
        resource.rename("final");
        assert_eq!(resource.name, "final");
        assert_eq!(resource.revision, 1);
    }

    #[test]
    fn validate_rejects_blank_name() {
        let resource = Resource::new("   ");
        assert_eq!(resource.validate(), Err(ResourceValidationError::BlankName));
    }
}
