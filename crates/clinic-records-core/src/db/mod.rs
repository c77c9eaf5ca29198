//! Database layer for clinic records.

mod crud;
mod medical_tests;
mod patients;
mod query;
mod schema;

pub use crud::*;
pub use medical_tests::*;
pub use patients::*;
pub use query::*;
pub use schema::*;

use rusqlite::{ffi, Connection, ErrorCode};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, DeletePolicy};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, msg) = &e {
            if err.code == ErrorCode::ConstraintViolation {
                let detail = msg.clone().unwrap_or_else(|| err.to_string());
                return match err.extended_code {
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => DbError::ForeignKey(detail),
                    ffi::SQLITE_CONSTRAINT_NOTNULL | ffi::SQLITE_CONSTRAINT_CHECK => {
                        DbError::Validation(detail)
                    }
                    _ => DbError::Constraint(detail),
                };
            }
        }
        DbError::Sqlite(e)
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    delete_policy: DeletePolicy,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened database");
        Self::initialize(conn, DeletePolicy::default())
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, DeletePolicy::default())
    }

    /// Open the database described by `config`.
    pub fn open_with(config: &Config) -> DbResult<Self> {
        let db = match &config.database_path {
            Some(path) => Self::open(path)?,
            None => {
                info!("opened in-memory database");
                Self::open_in_memory()?
            }
        };
        Ok(db.with_delete_policy(config.delete_policy))
    }

    /// Initialize schema.
    fn initialize(conn: Connection, delete_policy: DeletePolicy) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            delete_policy,
        })
    }

    /// Replace the patient delete policy.
    pub fn with_delete_policy(mut self, delete_policy: DeletePolicy) -> Self {
        self.delete_policy = delete_policy;
        self
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    ///
    /// Repositories over the transaction are built with
    /// [`PatientsRepository::new`] and [`MedicalTestsRepository::new`].
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Patient repository over this database's connection.
    pub fn patients(&self) -> PatientsRepository<'_> {
        PatientsRepository::new(&self.conn, self.delete_policy)
    }

    /// Medical test repository over this database's connection.
    pub fn medical_tests(&self) -> MedicalTestsRepository<'_> {
        MedicalTestsRepository::new(&self.conn)
    }
}

const SAVEPOINT: &str = "clinic_records";

/// Run `f` inside a savepoint, rolling back everything it wrote on error.
///
/// Savepoints nest, so this works both inside and outside a caller's
/// transaction.
pub(crate) fn with_savepoint<T, F>(conn: &Connection, f: F) -> DbResult<T>
where
    F: FnOnce() -> DbResult<T>,
{
    conn.execute_batch(&format!("SAVEPOINT {}", SAVEPOINT))?;
    match f() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {}", SAVEPOINT))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) =
                conn.execute_batch(&format!("ROLLBACK TO {0}; RELEASE {0}", SAVEPOINT))
            {
                warn!(error = %rollback, "savepoint rollback failed");
            }
            Err(e)
        }
    }
}
