//! Repository layer: generic CRUD engine and concrete entity mappings.
//!
//! # Responsibility
//! - Implement the canonical CRUD operations once, over entity-supplied
//!   SQL and row mappings (`crud`).
//! - Provide the concrete Person/Address aggregate mappings
//!   (`people_repo`, `address_repo`).
//!
//! # Invariants
//! - Statement sets are validated when a repository is constructed, not
//!   per call.
//! - Repositories issue one statement per operation against a
//!   caller-supplied connection and never manage transaction boundaries.

pub mod address_repo;
pub mod crud;
pub mod people_repo;
