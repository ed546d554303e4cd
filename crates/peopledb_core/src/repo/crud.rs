//! Generic CRUD engine over entity-supplied SQL and row mappings.
//!
//! # Responsibility
//! - Resolve which SQL statement serves a given operation for an entity
//!   (declared override first, engine default second).
//! - Run the canonical operations (save, find, count, update, delete)
//!   against a caller-supplied connection.
//! - Delegate row-to-record conversion and identity access to the entity's
//!   [`EntityMapping`].
//!
//! # Invariants
//! - A statement set declares at most one SQL text per operation.
//! - The engine sets a record's identity exactly once, after a successful
//!   insert.
//! - Update SQL binds the identity as its final placeholder.
//! - Delete-many SQL carries the literal `:ids` token; identities are
//!   bound positionally, one placeholder per record.

use crate::db::DbError;
use rusqlite::types::{FromSql, Value};
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Token in delete-many SQL replaced by one placeholder per identity.
pub const IDS_TOKEN: &str = ":ids";

pub type RepoResult<T> = Result<T, RepoError>;

/// The closed set of operations a statement set can be resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOperation {
    Save,
    FindById,
    FindAll,
    Count,
    Update,
    DeleteOne,
    DeleteMany,
}

impl Display for CrudOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Save => "save",
            Self::FindById => "find_by_id",
            Self::FindAll => "find_all",
            Self::Count => "count",
            Self::Update => "update",
            Self::DeleteOne => "delete_one",
            Self::DeleteMany => "delete_many",
        };
        f.write_str(name)
    }
}

/// Errors from generic repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error outside a specific operation.
    Db(DbError),
    /// A statement failed while executing the named operation.
    Execution {
        operation: CrudOperation,
        source: DbError,
    },
    /// No SQL declared for the operation and the engine has no default.
    SqlNotDefined(CrudOperation),
    /// The entity declared more than one SQL text for one operation.
    DuplicateSql(CrudOperation),
    /// Delete-many SQL does not contain the `:ids` token.
    MissingIdsToken,
    /// The operation requires a persisted identity, but none is assigned.
    IdentityUnset,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from an expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A required aliased column is absent from the result row.
    ColumnNotFound(String),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Execution { operation, source } => {
                write!(f, "{operation} statement failed: {source}")
            }
            Self::SqlNotDefined(operation) => {
                write!(f, "no SQL defined for operation `{operation}`")
            }
            Self::DuplicateSql(operation) => {
                write!(f, "duplicate SQL declared for operation `{operation}`")
            }
            Self::MissingIdsToken => {
                write!(f, "delete-many SQL is missing the `{IDS_TOKEN}` token")
            }
            Self::IdentityUnset => write!(f, "record has no identity assigned yet"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::ColumnNotFound(alias) => {
                write!(f, "column not found for alias `{alias}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Execution { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Per-entity statement set: declared (operation → SQL) overrides.
///
/// Declarations are validated once at construction; resolution afterwards
/// is a pure lookup safe to keep for the process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct EntitySql {
    overrides: &'static [(CrudOperation, &'static str)],
}

impl EntitySql {
    /// Validates that each operation is declared at most once.
    pub fn new(overrides: &'static [(CrudOperation, &'static str)]) -> RepoResult<Self> {
        for (index, (operation, _)) in overrides.iter().enumerate() {
            if overrides[..index].iter().any(|(prior, _)| prior == operation) {
                return Err(RepoError::DuplicateSql(*operation));
            }
        }
        Ok(Self { overrides })
    }

    /// Returns the declared SQL for `operation`, or the engine default.
    ///
    /// Every operation except `FindById` defaults to a configuration
    /// error; `FindById` defaults to the empty statement.
    pub fn resolve(&self, operation: CrudOperation) -> RepoResult<&'static str> {
        if let Some((_, sql)) = self
            .overrides
            .iter()
            .find(|(declared, _)| *declared == operation)
        {
            return Ok(sql);
        }

        match operation {
            CrudOperation::FindById => Ok(""),
            other => Err(RepoError::SqlNotDefined(other)),
        }
    }
}

/// Mapping contract a concrete entity supplies to the generic engine.
///
/// Identity access is an explicit accessor/mutator pair resolved at
/// compile time rather than discovered per call.
pub trait EntityMapping {
    type Record;

    /// Statement set consulted before engine defaults.
    fn sql(&self) -> &EntitySql;

    /// Reads the generated identity; `None` until first save.
    fn identity(&self, record: &Self::Record) -> Option<i64>;

    /// Writes the backend-generated identity after a successful insert.
    fn set_identity(&self, record: &mut Self::Record, id: i64);

    /// Produces insert parameters in declaration order.
    ///
    /// Owned sub-records must be persisted here, before the parameters
    /// are returned: the owner row references their generated identities.
    fn map_for_save(&self, record: &mut Self::Record) -> RepoResult<Vec<Value>>;

    /// Produces update parameters for the scalar attributes. The engine
    /// appends the identity as the statement's final parameter.
    fn map_for_update(&self, record: &Self::Record) -> RepoResult<Vec<Value>>;

    /// Rebuilds one record from a result row.
    fn extract_from_row(&self, row: &Row<'_>) -> RepoResult<Self::Record>;

    /// Hook invoked after the identity is assigned. Default no-op.
    fn post_save(&self, _record: &mut Self::Record, _id: i64) -> RepoResult<()> {
        Ok(())
    }
}

/// Generic repository over one entity mapping and one open connection.
///
/// Issues exactly one statement per call and never manages transaction
/// boundaries; the caller owns commit/rollback scope. The borrowed
/// `Connection` is the unit of serialization.
pub struct Repository<'conn, M: EntityMapping> {
    conn: &'conn Connection,
    mapping: M,
}

impl<'conn, M: EntityMapping> Repository<'conn, M> {
    pub fn new(conn: &'conn Connection, mapping: M) -> Self {
        Self { conn, mapping }
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// Inserts the record and assigns its generated identity.
    ///
    /// On failure the record is left untouched: the identity stays unset.
    pub fn save(&self, record: &mut M::Record) -> RepoResult<i64> {
        let sql = self.mapping.sql().resolve(CrudOperation::Save)?;
        let params = self.mapping.map_for_save(record)?;

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| execution(CrudOperation::Save, err))?;
        stmt.execute(params_from_iter(params))
            .map_err(|err| execution(CrudOperation::Save, err))?;

        let id = self.conn.last_insert_rowid();
        self.mapping.set_identity(record, id);
        self.mapping.post_save(record, id)?;
        Ok(id)
    }

    /// Looks up one record by identity.
    ///
    /// Zero rows yield `Ok(None)`. When the statement matches more than
    /// one row the last extracted record wins; selectivity on the
    /// identity is the statement's responsibility.
    pub fn find_by_id(&self, id: i64) -> RepoResult<Option<M::Record>> {
        let sql = self.mapping.sql().resolve(CrudOperation::FindById)?;
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| execution(CrudOperation::FindById, err))?;
        let mut rows = stmt
            .query([id])
            .map_err(|err| execution(CrudOperation::FindById, err))?;

        let mut found = None;
        while let Some(row) = rows
            .next()
            .map_err(|err| execution(CrudOperation::FindById, err))?
        {
            found = Some(self.mapping.extract_from_row(row)?);
        }
        Ok(found)
    }

    /// Returns all records in result-set order; no application-level sort.
    pub fn find_all(&self) -> RepoResult<Vec<M::Record>> {
        let sql = self.mapping.sql().resolve(CrudOperation::FindAll)?;
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| execution(CrudOperation::FindAll, err))?;
        let mut rows = stmt
            .query([])
            .map_err(|err| execution(CrudOperation::FindAll, err))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|err| execution(CrudOperation::FindAll, err))?
        {
            records.push(self.mapping.extract_from_row(row)?);
        }
        Ok(records)
    }

    /// Returns the scalar from the first result row, or 0 without rows.
    pub fn count(&self) -> RepoResult<i64> {
        let sql = self.mapping.sql().resolve(CrudOperation::Count)?;
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| execution(CrudOperation::Count, err))?;
        let mut rows = stmt
            .query([])
            .map_err(|err| execution(CrudOperation::Count, err))?;

        match rows
            .next()
            .map_err(|err| execution(CrudOperation::Count, err))?
        {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    /// Rewrites the record's scalar attributes.
    ///
    /// The update SQL's last placeholder must be the identity; that
    /// position is a fixed contract between statement and engine.
    pub fn update(&self, record: &M::Record) -> RepoResult<()> {
        let sql = self.mapping.sql().resolve(CrudOperation::Update)?;
        let id = self
            .mapping
            .identity(record)
            .ok_or(RepoError::IdentityUnset)?;

        let mut params = self.mapping.map_for_update(record)?;
        params.push(Value::Integer(id));

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|err| execution(CrudOperation::Update, err))?;
        stmt.execute(params_from_iter(params))
            .map_err(|err| execution(CrudOperation::Update, err))?;
        Ok(())
    }

    /// Deletes the record's row. Does not verify a row was removed.
    pub fn delete(&self, record: &M::Record) -> RepoResult<()> {
        let sql = self.mapping.sql().resolve(CrudOperation::DeleteOne)?;
        let id = self
            .mapping
            .identity(record)
            .ok_or(RepoError::IdentityUnset)?;

        self.conn
            .execute(sql, [id])
            .map_err(|err| execution(CrudOperation::DeleteOne, err))?;
        Ok(())
    }

    /// Deletes every given record in one batched statement.
    ///
    /// The declared delete-many SQL must carry the `:ids` token; it is
    /// replaced with one placeholder per record and the identities are
    /// bound positionally. Identities are engine-generated integers, so
    /// the general-purpose path stays fully parameterized.
    pub fn delete_many(&self, records: &[M::Record]) -> RepoResult<()> {
        let sql = self.mapping.sql().resolve(CrudOperation::DeleteMany)?;
        if !sql.contains(IDS_TOKEN) {
            return Err(RepoError::MissingIdsToken);
        }
        if records.is_empty() {
            return Ok(());
        }

        let ids = records
            .iter()
            .map(|record| self.mapping.identity(record).ok_or(RepoError::IdentityUnset))
            .collect::<RepoResult<Vec<i64>>>()?;

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = sql.replace(IDS_TOKEN, &placeholders);

        self.conn
            .execute(&sql, params_from_iter(ids))
            .map_err(|err| execution(CrudOperation::DeleteMany, err))?;
        Ok(())
    }
}

/// Reads a column by result-set label, failing when the label is absent.
///
/// Joins shift column positions depending on which columns are selected,
/// so lookups go by label, never by position. Use `Option<T>` for
/// nullable columns.
pub fn column_by_alias<T: FromSql>(row: &Row<'_>, alias: &str) -> RepoResult<T> {
    match row.get::<_, T>(alias) {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::InvalidColumnName(_)) => {
            Err(RepoError::ColumnNotFound(alias.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Probes a column by label: an absent label and a NULL value both read
/// as `None`.
///
/// Used for sub-record identity probes and for columns that only some of
/// an entity's statements select.
pub fn probe_column<T: FromSql>(row: &Row<'_>, alias: &str) -> RepoResult<Option<T>> {
    match row.get::<_, Option<T>>(alias) {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn execution(operation: CrudOperation, err: rusqlite::Error) -> RepoError {
    RepoError::Execution {
        operation,
        source: DbError::Sqlite(err),
    }
}

/// Fails fast when the connection is not migrated to the version this
/// binary expects, or when a required table/column is absent.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &'static [&'static str],
) -> RepoResult<()> {
    let expected_version = crate::db::migrations::latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for column in columns.iter().copied() {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOY_SQL: &[(CrudOperation, &str)] = &[
        (CrudOperation::Save, "INSERT INTO toys (name) VALUES (?)"),
        (CrudOperation::DeleteMany, "DELETE FROM toys WHERE id IN (:ids)"),
    ];

    #[test]
    fn duplicate_declarations_are_rejected() {
        let declared = &[
            (CrudOperation::Count, "SELECT COUNT(*) FROM toys"),
            (CrudOperation::Count, "SELECT 0"),
        ];
        let err = EntitySql::new(declared).unwrap_err();
        assert!(matches!(err, RepoError::DuplicateSql(CrudOperation::Count)));
    }

    #[test]
    fn resolve_prefers_declared_override() {
        let sql = EntitySql::new(TOY_SQL).unwrap();
        assert_eq!(
            sql.resolve(CrudOperation::Save).unwrap(),
            "INSERT INTO toys (name) VALUES (?)"
        );
    }

    #[test]
    fn undeclared_operations_fail_with_configuration_error() {
        let sql = EntitySql::new(TOY_SQL).unwrap();
        for operation in [
            CrudOperation::FindAll,
            CrudOperation::Count,
            CrudOperation::Update,
            CrudOperation::DeleteOne,
        ] {
            let err = sql.resolve(operation).unwrap_err();
            assert!(matches!(err, RepoError::SqlNotDefined(op) if op == operation));
        }
    }

    #[test]
    fn find_by_id_defaults_to_empty_statement() {
        let sql = EntitySql::new(TOY_SQL).unwrap();
        assert_eq!(sql.resolve(CrudOperation::FindById).unwrap(), "");
    }

    #[test]
    fn operation_names_are_stable() {
        assert_eq!(CrudOperation::DeleteMany.to_string(), "delete_many");
        assert_eq!(CrudOperation::FindById.to_string(), "find_by_id");
    }
}
