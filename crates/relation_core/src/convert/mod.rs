//! Conversion between relation entities and the store's native key.
//!
//! # Responsibility
//! - Own the native composite-key encoding (`parentId` / `childId`).
//! - Keep the store key representation out of domain entities.
//!
//! # Invariants
//! - Conversions are pure: no storage access, no logging.
//! - Parts are always placed as `(owner -> parentId, member -> childId)`.

pub mod native_key;
pub mod relation_converter;
