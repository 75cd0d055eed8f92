//! Domain model for owner/member relations and upsert results.
//!
//! # Responsibility
//! - Define the relation capability and the stored relation record.
//! - Define the scalar-keyed resource that owners and members resolve to.
//! - Define the tagged created/updated result returned by upserts.
//!
//! # Invariants
//! - A valid relation always carries both its owner and member identifier.
//! - `(owner_id, member_id)` identifies at most one relation row.

pub mod relation;
pub mod resource;
pub mod state;
