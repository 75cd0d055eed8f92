//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into relation use-cases.
//! - Keep callers decoupled from store keys and storage details.

pub mod relation_service;
