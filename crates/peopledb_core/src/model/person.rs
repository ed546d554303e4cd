//! Person domain record.
//!
//! # Responsibility
//! - Define the primary record of the Person/Address aggregate.
//! - Pin down the equality contract used by deduplication and tests.
//!
//! # Invariants
//! - `id` is `None` before first save and assigned exactly once by the
//!   repository.
//! - Equality covers first name, last name and date of birth only.

use crate::model::address::Address;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Backend-generated identity for a persisted person row.
pub type PersonId = i64;

/// Primary record of the aggregate, owning up to two addresses by role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// `None` until first save.
    pub id: Option<PersonId>,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth with an explicit offset. Persisted normalized to the
    /// zero offset; the represented instant is what round-trips.
    pub dob: DateTime<FixedOffset>,
    pub salary: Option<Decimal>,
    pub email: Option<String>,
    pub home_address: Option<Address>,
    pub business_address: Option<Address>,
}

impl Person {
    /// Creates an unsaved person; salary, email and addresses start absent.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        dob: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            dob,
            salary: None,
            email: None,
            home_address: None,
            business_address: None,
        }
    }
}

// Equality is identity-of-person, not row equality: salary, email and
// addresses do not participate. `DateTime` comparison is instant-based, so
// the same moment expressed in different offsets compares equal.
impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.dob == other.dob
    }
}

impl Eq for Person {}
