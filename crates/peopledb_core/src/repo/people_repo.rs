//! Person aggregate mapping and repository.
//!
//! # Responsibility
//! - Declare the full PEOPLE statement set consumed by the generic engine.
//! - Extract a person plus up to two joined addresses from one row, using
//!   role-specific column-alias prefixes.
//! - Cascade-save owned addresses before the owner row is inserted.
//!
//! # Invariants
//! - Owned addresses are persisted before the person insert binds their
//!   generated identities as foreign keys; an absent role binds NULL.
//! - DOB is normalized to the zero offset on bind and reconstructed with
//!   that offset on read; the represented instant round-trips losslessly.
//! - The update statement's final placeholder is the person identity.

use crate::model::address::{Address, AddressId};
use crate::model::person::{Person, PersonId};
use crate::repo::address_repo::{extract_address, AddressRepository};
use crate::repo::crud::{
    column_by_alias, ensure_connection_ready, probe_column, CrudOperation, EntityMapping,
    EntitySql, RepoError, RepoResult, Repository,
};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

/// Column-alias prefix for the home-address join.
pub const HOME_PREFIX: &str = "HOME_";
/// Column-alias prefix for the business-address join.
pub const BIZ_PREFIX: &str = "BIZ_";

const SAVE_PERSON_SQL: &str = "INSERT INTO PEOPLE
    (FIRST_NAME, LAST_NAME, DOB, SALARY, EMAIL, HOME_ADDRESS, BIZ_ADDRESS)
    VALUES (?, ?, ?, ?, ?, ?, ?)";

const FIND_PERSON_BY_ID_SQL: &str = "SELECT
    P.ID, P.FIRST_NAME, P.LAST_NAME, P.DOB, P.SALARY, P.EMAIL,
    HOME.ID AS HOME_ID,
    HOME.STREET_ADDRESS AS HOME_STREET_ADDRESS,
    HOME.ADDRESS2 AS HOME_ADDRESS2,
    HOME.CITY AS HOME_CITY,
    HOME.STATE AS HOME_STATE,
    HOME.POSTCODE AS HOME_POSTCODE,
    HOME.COUNTY AS HOME_COUNTY,
    HOME.COUNTRY AS HOME_COUNTRY,
    HOME.REGION AS HOME_REGION,
    BIZ.ID AS BIZ_ID,
    BIZ.STREET_ADDRESS AS BIZ_STREET_ADDRESS,
    BIZ.ADDRESS2 AS BIZ_ADDRESS2,
    BIZ.CITY AS BIZ_CITY,
    BIZ.STATE AS BIZ_STATE,
    BIZ.POSTCODE AS BIZ_POSTCODE,
    BIZ.COUNTY AS BIZ_COUNTY,
    BIZ.COUNTRY AS BIZ_COUNTRY,
    BIZ.REGION AS BIZ_REGION
    FROM PEOPLE AS P
    LEFT OUTER JOIN ADDRESSES AS HOME ON P.HOME_ADDRESS = HOME.ID
    LEFT OUTER JOIN ADDRESSES AS BIZ ON P.BIZ_ADDRESS = BIZ.ID
    WHERE P.ID = ?";

const FIND_ALL_PEOPLE_SQL: &str =
    "SELECT ID, FIRST_NAME, LAST_NAME, DOB, SALARY FROM PEOPLE";

const COUNT_PEOPLE_SQL: &str = "SELECT COUNT(*) FROM PEOPLE";

const DELETE_PERSON_SQL: &str = "DELETE FROM PEOPLE WHERE ID = ?";

const DELETE_PEOPLE_IN_SQL: &str = "DELETE FROM PEOPLE WHERE ID IN (:ids)";

const UPDATE_PERSON_SQL: &str =
    "UPDATE PEOPLE SET FIRST_NAME = ?, LAST_NAME = ?, DOB = ?, SALARY = ? WHERE ID = ?";

const PERSON_SQL: &[(CrudOperation, &str)] = &[
    (CrudOperation::Save, SAVE_PERSON_SQL),
    (CrudOperation::FindById, FIND_PERSON_BY_ID_SQL),
    (CrudOperation::FindAll, FIND_ALL_PEOPLE_SQL),
    (CrudOperation::Count, COUNT_PEOPLE_SQL),
    (CrudOperation::Update, UPDATE_PERSON_SQL),
    (CrudOperation::DeleteOne, DELETE_PERSON_SQL),
    (CrudOperation::DeleteMany, DELETE_PEOPLE_IN_SQL),
];

const PEOPLE_COLUMNS: &[&str] = &[
    "ID",
    "FIRST_NAME",
    "LAST_NAME",
    "DOB",
    "SALARY",
    "EMAIL",
    "HOME_ADDRESS",
    "BIZ_ADDRESS",
];

/// Row mapping for the [`Person`] aggregate.
///
/// Owns the address repository as an explicit collaborator: the cascade
/// runs through it, the generic engine never learns the aggregate shape.
pub struct PersonMapping<'conn> {
    sql: EntitySql,
    addresses: AddressRepository<'conn>,
}

impl<'conn> PersonMapping<'conn> {
    /// Builds the aggregate mapping around the collaborator that persists
    /// owned addresses during save.
    pub fn new(addresses: AddressRepository<'conn>) -> RepoResult<Self> {
        Ok(Self {
            sql: EntitySql::new(PERSON_SQL)?,
            addresses,
        })
    }

    fn save_owned(&self, address: Option<&mut Address>) -> RepoResult<Option<AddressId>> {
        match address {
            Some(address) => Ok(Some(self.addresses.save(address)?)),
            None => Ok(None),
        }
    }
}

/// SQLite-backed person repository.
pub type PersonRepository<'conn> = Repository<'conn, PersonMapping<'conn>>;

impl<'conn> Repository<'conn, PersonMapping<'conn>> {
    /// Validates schema readiness and statement declarations, then wires
    /// the aggregate mapping to the shared connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "PEOPLE", PEOPLE_COLUMNS)?;
        let mapping = PersonMapping::new(AddressRepository::try_new(conn)?)?;
        Ok(Repository::new(conn, mapping))
    }
}

impl EntityMapping for PersonMapping<'_> {
    type Record = Person;

    fn sql(&self) -> &EntitySql {
        &self.sql
    }

    fn identity(&self, record: &Person) -> Option<i64> {
        record.id
    }

    fn set_identity(&self, record: &mut Person, id: i64) {
        record.id = Some(id);
    }

    // Addresses must be saved before the parameters are returned: the
    // person row references their generated identities.
    fn map_for_save(&self, record: &mut Person) -> RepoResult<Vec<Value>> {
        let home_id = self.save_owned(record.home_address.as_mut())?;
        let business_id = self.save_owned(record.business_address.as_mut())?;

        Ok(vec![
            Value::Text(record.first_name.clone()),
            Value::Text(record.last_name.clone()),
            Value::Integer(dob_to_epoch_ms(&record.dob)),
            salary_to_value(&record.salary),
            text_or_null(&record.email),
            id_or_null(home_id),
            id_or_null(business_id),
        ])
    }

    fn map_for_update(&self, record: &Person) -> RepoResult<Vec<Value>> {
        Ok(vec![
            Value::Text(record.first_name.clone()),
            Value::Text(record.last_name.clone()),
            Value::Integer(dob_to_epoch_ms(&record.dob)),
            salary_to_value(&record.salary),
        ])
    }

    fn extract_from_row(&self, row: &Row<'_>) -> RepoResult<Person> {
        let id: PersonId = column_by_alias(row, "ID")?;
        let dob = dob_from_epoch_ms(column_by_alias(row, "DOB")?)?;
        let salary = parse_salary(column_by_alias(row, "SALARY")?)?;

        // EMAIL and the joined address columns are absent from the
        // find-all projection; probing keeps one extractor for both
        // statements.
        Ok(Person {
            id: Some(id),
            first_name: column_by_alias(row, "FIRST_NAME")?,
            last_name: column_by_alias(row, "LAST_NAME")?,
            dob,
            salary,
            email: probe_column(row, "EMAIL")?,
            home_address: extract_address(row, HOME_PREFIX)?,
            business_address: extract_address(row, BIZ_PREFIX)?,
        })
    }
}

fn dob_to_epoch_ms(dob: &DateTime<FixedOffset>) -> i64 {
    dob.with_timezone(&Utc).timestamp_millis()
}

fn dob_from_epoch_ms(epoch_ms: i64) -> RepoResult<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|utc| utc.with_timezone(&Utc.fix()))
        .ok_or_else(|| {
            RepoError::InvalidData(format!("epoch millis `{epoch_ms}` out of range in PEOPLE.DOB"))
        })
}

fn salary_to_value(salary: &Option<Decimal>) -> Value {
    salary
        .as_ref()
        .map_or(Value::Null, |amount| Value::Text(amount.to_string()))
}

fn parse_salary(text: Option<String>) -> RepoResult<Option<Decimal>> {
    match text {
        Some(text) => text.parse::<Decimal>().map(Some).map_err(|_| {
            RepoError::InvalidData(format!("malformed salary `{text}` in PEOPLE.SALARY"))
        }),
        None => Ok(None),
    }
}

fn text_or_null(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map_or(Value::Null, |text| Value::Text(text.clone()))
}

fn id_or_null(id: Option<i64>) -> Value {
    id.map_or(Value::Null, Value::Integer)
}

#[cfg(test)]
mod tests {
    use super::{dob_from_epoch_ms, dob_to_epoch_ms, parse_salary};
    use crate::repo::crud::RepoError;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn dob_codec_preserves_the_instant_across_offsets() {
        let central = FixedOffset::west_opt(6 * 3600).unwrap();
        let dob = central.with_ymd_and_hms(1980, 11, 15, 15, 15, 0).unwrap();

        let decoded = dob_from_epoch_ms(dob_to_epoch_ms(&dob)).unwrap();
        assert_eq!(decoded, dob);
        assert_eq!(decoded.offset().local_minus_utc(), 0);
    }

    #[test]
    fn malformed_salary_text_is_invalid_data() {
        let err = parse_salary(Some("not-a-number".to_string())).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }

    #[test]
    fn absent_salary_reads_as_none() {
        assert_eq!(parse_salary(None).unwrap(), None);
    }
}
