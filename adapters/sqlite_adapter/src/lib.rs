//! SQLite implementation of the connection provider.
//!
//! Each `acquire` opens a fresh connection to the configured database file;
//! dropping the returned handle closes it. The employee procedures are hosted
//! as statements in [`procedures`].

pub mod config;
pub mod procedures;

use std::path::PathBuf;

use rusqlite::types::Value;
use rusqlite::{ffi, params_from_iter, Connection, ErrorCode, OpenFlags};
use staffdesk_core::{
    ConnectionProvider, EmployeeGateway, GatewayError, Procedure, Row, SqlValue, StoreConnection,
    StoreError, StoreErrorKind,
};
use tracing::{debug, info};

pub use config::{ConfigError, ConnectionSettings};
use procedures::procedure_sql;

/// Schema the hosted procedures expect.
pub const REFERENCE_SCHEMA: &str = include_str!("../sql/schema.sql");

/// SQLite implementation of the ConnectionProvider trait
#[derive(Debug)]
pub struct SqliteConnectionProvider {
    settings: ConnectionSettings,
}

impl SqliteConnectionProvider {
    /// Validates the settings by opening the database once and reading its
    /// header. The database file must already exist.
    pub fn new(settings: ConnectionSettings) -> Result<Self, StoreError> {
        let provider = Self { settings };
        let conn = provider.open()?;
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| {
                StoreError::new(
                    StoreErrorKind::Connection,
                    format!(
                        "{} is not a readable SQLite database",
                        provider.settings.database_path.display()
                    ),
                )
                .with_source(e)
            })?;
        info!(database = %provider.settings.database_path.display(), "sqlite provider ready");
        Ok(provider)
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let path = &self.settings.database_path;
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            StoreError::new(
                StoreErrorKind::Connection,
                format!("could not open database {}", path.display()),
            )
            .with_source(e)
        })?;

        conn.busy_timeout(self.settings.busy_timeout)
            .and_then(|_| conn.execute_batch("PRAGMA foreign_keys = ON;"))
            .map_err(|e| {
                StoreError::new(StoreErrorKind::Connection, "could not configure connection")
                    .with_source(e)
            })?;

        Ok(conn)
    }
}

impl ConnectionProvider for SqliteConnectionProvider {
    fn acquire(&self) -> Result<Box<dyn StoreConnection + '_>, StoreError> {
        let conn = self.open()?;
        debug!("connection acquired");
        Ok(Box::new(SqliteConnection { conn }))
    }
}

/// Builds a gateway over the database described by `settings`.
pub fn open_gateway(settings: &ConnectionSettings) -> Result<EmployeeGateway, GatewayError> {
    let provider =
        SqliteConnectionProvider::new(settings.clone()).map_err(GatewayError::Initialization)?;
    Ok(EmployeeGateway::new(Box::new(provider)))
}

/// Like [`open_gateway`], with settings read from the environment.
/// `database` replaces the configured database path when given.
pub fn open_gateway_from_env(database: Option<PathBuf>) -> Result<EmployeeGateway, GatewayError> {
    let settings = ConnectionSettings::from_env(database).map_err(|e| {
        GatewayError::Initialization(
            StoreError::new(StoreErrorKind::Connection, "invalid connection settings")
                .with_source(e),
        )
    })?;
    open_gateway(&settings)
}

pub struct SqliteConnection {
    conn: Connection,
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        debug!("connection released");
    }
}

impl StoreConnection for SqliteConnection {
    fn query(&mut self, procedure: Procedure, params: &[SqlValue]) -> Result<Vec<Row>, StoreError> {
        check_arity(procedure, params)?;
        let mut stmt = self
            .conn
            .prepare(procedure_sql(procedure))
            .map_err(|e| translate(procedure, e))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(to_sqlite)))
            .map_err(|e| translate(procedure, e))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(|e| translate(procedure, e))? {
            let mut mapped = Row::new();
            for (index, column) in columns.iter().enumerate() {
                let value: Value = row.get(index).map_err(|e| translate(procedure, e))?;
                mapped.push(column.as_str(), from_sqlite(procedure, column, value)?);
            }
            result.push(mapped);
        }
        Ok(result)
    }

    fn execute(&mut self, procedure: Procedure, params: &[SqlValue]) -> Result<usize, StoreError> {
        check_arity(procedure, params)?;
        let mut stmt = self
            .conn
            .prepare(procedure_sql(procedure))
            .map_err(|e| translate(procedure, e))?;
        stmt.execute(params_from_iter(params.iter().map(to_sqlite)))
            .map_err(|e| translate(procedure, e))
    }
}

fn check_arity(procedure: Procedure, params: &[SqlValue]) -> Result<(), StoreError> {
    if params.len() == procedure.arity() {
        return Ok(());
    }
    Err(StoreError::new(
        StoreErrorKind::Query,
        format!(
            "{procedure} takes {} parameter(s), got {}",
            procedure.arity(),
            params.len()
        ),
    ))
}

/// Classifies a driver error; primary key and unique constraint failures
/// become unique violations, everything else a query failure.
fn translate(procedure: Procedure, error: rusqlite::Error) -> StoreError {
    let kind = match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && matches!(
                    failure.extended_code,
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
                ) =>
        {
            StoreErrorKind::UniqueViolation
        }
        _ => StoreErrorKind::Query,
    };
    StoreError::new(kind, format!("{procedure} failed")).with_source(error)
}

fn to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Integer(*value),
        SqlValue::Real(value) => Value::Real(*value),
        SqlValue::Text(value) => Value::Text(value.clone()),
    }
}

fn from_sqlite(procedure: Procedure, column: &str, value: Value) -> Result<SqlValue, StoreError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Integer(value) => Ok(SqlValue::Integer(value)),
        Value::Real(value) => Ok(SqlValue::Real(value)),
        Value::Text(value) => Ok(SqlValue::Text(value)),
        Value::Blob(bytes) => Err(StoreError::new(
            StoreErrorKind::Decode,
            format!(
                "{procedure}: column {column} holds a {}-byte blob",
                bytes.len()
            ),
        )),
    }
}
