//! Address mapping and repository.
//!
//! # Responsibility
//! - Declare the ADDRESSES statement set (save and find-by-id only).
//! - Own address row extraction, shared with the person aggregate via an
//!   alias prefix.
//!
//! # Invariants
//! - Every save inserts a new row; addresses are never deduplicated.
//! - REGION text is parsed case-insensitively against the closed
//!   [`Region`] set; unknown values are invalid data, not a new region.

use crate::model::address::{Address, AddressId, Region};
use crate::repo::crud::{
    column_by_alias, ensure_connection_ready, probe_column, CrudOperation, EntityMapping,
    EntitySql, RepoError, RepoResult, Repository,
};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

const SAVE_ADDRESS_SQL: &str = "INSERT INTO ADDRESSES
    (STREET_ADDRESS, ADDRESS2, CITY, STATE, POSTCODE, COUNTY, COUNTRY, REGION)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

const FIND_ADDRESS_BY_ID_SQL: &str = "SELECT
    ID, STREET_ADDRESS, ADDRESS2, CITY, STATE, POSTCODE, COUNTY, COUNTRY, REGION
    FROM ADDRESSES WHERE ID = ?";

// Address lifecycle is driven by the owning person; only save and
// find-by-id are declared, the rest fall through to engine defaults.
const ADDRESS_SQL: &[(CrudOperation, &str)] = &[
    (CrudOperation::Save, SAVE_ADDRESS_SQL),
    (CrudOperation::FindById, FIND_ADDRESS_BY_ID_SQL),
];

const ADDRESSES_COLUMNS: &[&str] = &[
    "ID",
    "STREET_ADDRESS",
    "ADDRESS2",
    "CITY",
    "STATE",
    "POSTCODE",
    "COUNTY",
    "COUNTRY",
    "REGION",
];

/// Row mapping for [`Address`].
pub struct AddressMapping {
    sql: EntitySql,
}

/// SQLite-backed address repository.
pub type AddressRepository<'conn> = Repository<'conn, AddressMapping>;

impl<'conn> Repository<'conn, AddressMapping> {
    /// Validates schema readiness and the statement set before first use.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "ADDRESSES", ADDRESSES_COLUMNS)?;
        let mapping = AddressMapping {
            sql: EntitySql::new(ADDRESS_SQL)?,
        };
        Ok(Repository::new(conn, mapping))
    }
}

impl EntityMapping for AddressMapping {
    type Record = Address;

    fn sql(&self) -> &EntitySql {
        &self.sql
    }

    fn identity(&self, record: &Address) -> Option<i64> {
        record.id
    }

    fn set_identity(&self, record: &mut Address, id: i64) {
        record.id = Some(id);
    }

    fn map_for_save(&self, record: &mut Address) -> RepoResult<Vec<Value>> {
        Ok(vec![
            Value::Text(record.street_address.clone()),
            text_or_null(&record.address2),
            Value::Text(record.city.clone()),
            Value::Text(record.state.clone()),
            Value::Text(record.postcode.clone()),
            text_or_null(&record.county),
            Value::Text(record.country.clone()),
            Value::Text(region_to_db(record.region).to_string()),
        ])
    }

    fn map_for_update(&self, record: &Address) -> RepoResult<Vec<Value>> {
        Ok(vec![
            Value::Text(record.street_address.clone()),
            text_or_null(&record.address2),
            Value::Text(record.city.clone()),
            Value::Text(record.state.clone()),
            Value::Text(record.postcode.clone()),
            text_or_null(&record.county),
            Value::Text(record.country.clone()),
            Value::Text(region_to_db(record.region).to_string()),
        ])
    }

    fn extract_from_row(&self, row: &Row<'_>) -> RepoResult<Address> {
        extract_address(row, "")?.ok_or_else(|| {
            RepoError::InvalidData("address row without an ID value".to_string())
        })
    }
}

/// Extracts one address from a row under the given column-alias prefix.
///
/// The `<PREFIX>ID` column is probed first: absent or NULL means no
/// address is present at that position and no further prefixed columns
/// are read. All remaining columns are then required.
pub(crate) fn extract_address(row: &Row<'_>, alias_prefix: &str) -> RepoResult<Option<Address>> {
    let id: AddressId = match probe_column(row, &prefixed(alias_prefix, "ID"))? {
        Some(id) => id,
        None => return Ok(None),
    };

    let region_text: String = column_by_alias(row, &prefixed(alias_prefix, "REGION"))?;
    let region = parse_region(&region_text).ok_or_else(|| {
        RepoError::InvalidData(format!("unknown region `{region_text}` in ADDRESSES.REGION"))
    })?;

    Ok(Some(Address {
        id: Some(id),
        street_address: column_by_alias(row, &prefixed(alias_prefix, "STREET_ADDRESS"))?,
        address2: column_by_alias(row, &prefixed(alias_prefix, "ADDRESS2"))?,
        city: column_by_alias(row, &prefixed(alias_prefix, "CITY"))?,
        state: column_by_alias(row, &prefixed(alias_prefix, "STATE"))?,
        postcode: column_by_alias(row, &prefixed(alias_prefix, "POSTCODE"))?,
        county: column_by_alias(row, &prefixed(alias_prefix, "COUNTY"))?,
        country: column_by_alias(row, &prefixed(alias_prefix, "COUNTRY"))?,
        region,
    }))
}

fn prefixed(alias_prefix: &str, column: &str) -> String {
    format!("{alias_prefix}{column}")
}

pub(crate) fn region_to_db(region: Region) -> &'static str {
    match region {
        Region::North => "NORTH",
        Region::South => "SOUTH",
        Region::East => "EAST",
        Region::West => "WEST",
        Region::Central => "CENTRAL",
    }
}

pub(crate) fn parse_region(value: &str) -> Option<Region> {
    match value.to_ascii_uppercase().as_str() {
        "NORTH" => Some(Region::North),
        "SOUTH" => Some(Region::South),
        "EAST" => Some(Region::East),
        "WEST" => Some(Region::West),
        "CENTRAL" => Some(Region::Central),
        _ => None,
    }
}

fn text_or_null(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map_or(Value::Null, |text| Value::Text(text.clone()))
}

#[cfg(test)]
mod tests {
    use super::{parse_region, region_to_db};
    use crate::model::address::Region;

    #[test]
    fn region_parse_is_case_insensitive() {
        assert_eq!(parse_region("west"), Some(Region::West));
        assert_eq!(parse_region("West"), Some(Region::West));
        assert_eq!(parse_region("WEST"), Some(Region::West));
    }

    #[test]
    fn unknown_region_is_rejected() {
        assert_eq!(parse_region("MIDLANDS"), None);
    }

    #[test]
    fn region_roundtrips_through_db_text() {
        for region in [
            Region::North,
            Region::South,
            Region::East,
            Region::West,
            Region::Central,
        ] {
            assert_eq!(parse_region(region_to_db(region)), Some(region));
        }
    }
}
