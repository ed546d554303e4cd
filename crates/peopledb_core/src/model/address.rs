//! Address domain record and region enumeration.

use serde::{Deserialize, Serialize};

/// Backend-generated identity for a persisted address row.
pub type AddressId = i64;

/// Closed set of geographic regions an address can belong to.
///
/// Persisted as uppercase text; read back case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    North,
    South,
    East,
    West,
    Central,
}

/// Postal address owned by at most one person per role.
///
/// The same physical address is never deduplicated: every save inserts a
/// new row and yields a fresh identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// `None` until first save.
    pub id: Option<AddressId>,
    pub street_address: String,
    /// Secondary line (apartment, unit). Nullable in storage.
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub county: Option<String>,
    pub country: String,
    pub region: Region,
}
