use peopledb_core::db::open_db_in_memory;
use peopledb_core::repo::crud::CrudOperation;
use peopledb_core::{Address, AddressRepository, Region, RepoError};
use rusqlite::Connection;

fn york_address() -> Address {
    Address {
        id: None,
        street_address: "2 Side Rd.".to_string(),
        address2: None,
        city: "York".to_string(),
        state: "YS".to_string(),
        postcode: "YO1 7HH".to_string(),
        county: None,
        country: "United Kingdom".to_string(),
        region: Region::North,
    }
}

#[test]
fn save_and_find_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = AddressRepository::try_new(&conn).unwrap();

    let mut address = york_address();
    let id = repo.save(&mut address).unwrap();
    assert!(id > 0);

    let found = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(found, address);
}

#[test]
fn every_save_inserts_a_new_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = AddressRepository::try_new(&conn).unwrap();

    let mut first = york_address();
    let mut second = york_address();
    let first_id = repo.save(&mut first).unwrap();
    let second_id = repo.save(&mut second).unwrap();

    assert_ne!(first_id, second_id);
}

#[test]
fn region_text_is_read_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = AddressRepository::try_new(&conn).unwrap();

    conn.execute(
        "INSERT INTO ADDRESSES
            (STREET_ADDRESS, ADDRESS2, CITY, STATE, POSTCODE, COUNTY, COUNTRY, REGION)
            VALUES ('2 Side Rd.', NULL, 'York', 'YS', 'YO1 7HH', NULL, 'United Kingdom', 'north');",
        [],
    )
    .unwrap();
    let id = conn.last_insert_rowid();

    let found = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(found.region, Region::North);
}

#[test]
fn unknown_region_text_is_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = AddressRepository::try_new(&conn).unwrap();

    conn.execute(
        "INSERT INTO ADDRESSES
            (STREET_ADDRESS, ADDRESS2, CITY, STATE, POSTCODE, COUNTY, COUNTRY, REGION)
            VALUES ('2 Side Rd.', NULL, 'York', 'YS', 'YO1 7HH', NULL, 'United Kingdom', 'MIDLANDS');",
        [],
    )
    .unwrap();
    let id = conn.last_insert_rowid();

    assert!(matches!(
        repo.find_by_id(id).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

// Addresses declare SQL for save and find-by-id only; everything else
// must fall through to the engine's fail-loudly default.
#[test]
fn undeclared_operations_fail_with_configuration_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = AddressRepository::try_new(&conn).unwrap();

    let mut saved = york_address();
    repo.save(&mut saved).unwrap();

    assert!(matches!(
        repo.find_all().unwrap_err(),
        RepoError::SqlNotDefined(CrudOperation::FindAll)
    ));
    assert!(matches!(
        repo.count().unwrap_err(),
        RepoError::SqlNotDefined(CrudOperation::Count)
    ));
    assert!(matches!(
        repo.update(&saved).unwrap_err(),
        RepoError::SqlNotDefined(CrudOperation::Update)
    ));
    assert!(matches!(
        repo.delete(&saved).unwrap_err(),
        RepoError::SqlNotDefined(CrudOperation::DeleteOne)
    ));
    assert!(matches!(
        repo.delete_many(&[saved]).unwrap_err(),
        RepoError::SqlNotDefined(CrudOperation::DeleteMany)
    ));
}

#[test]
fn repository_rejects_connection_without_addresses_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "PRAGMA user_version = {};",
        peopledb_core::db::migrations::latest_version()
    ))
    .unwrap();

    assert!(matches!(
        AddressRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("ADDRESSES"))
    ));
}
