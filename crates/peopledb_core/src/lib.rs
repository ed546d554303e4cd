//! Core data-access layer for the people database.
//!
//! The generic CRUD engine lives in [`repo::crud`]; concrete entities
//! supply SQL and row mappings through [`repo::crud::EntityMapping`]. The
//! Person/Address aggregate is the shipped concrete mapping.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::address::{Address, AddressId, Region};
pub use model::person::{Person, PersonId};
pub use repo::address_repo::AddressRepository;
pub use repo::crud::{
    CrudOperation, EntityMapping, EntitySql, RepoError, RepoResult, Repository, IDS_TOKEN,
};
pub use repo::people_repo::{PersonRepository, BIZ_PREFIX, HOME_PREFIX};
