//! Domain model for the people database.
//!
//! # Responsibility
//! - Define the in-memory records mapped to PEOPLE/ADDRESSES rows.
//! - Keep persistence concerns (SQL, column names) out of the model.
//!
//! # Invariants
//! - A record's identity is `None` until the repository assigns it after
//!   the first save.
//! - Owned sub-records are plain values; absence is `None`, never a
//!   sentinel identity.

pub mod address;
pub mod person;
