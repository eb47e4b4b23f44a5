//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define entity-oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories never open transactions; services own transaction scope and
//!   hand repositories the transaction's connection.
//! - Uniqueness violations surface as `RepoError::UniqueViolation`, never as
//!   raw SQLite errors.
//! - Deletes are idempotent: removing an absent row is not an error.

pub mod member_repo;
pub mod project_repo;
pub mod task_repo;
pub mod user_repo;
pub mod workspace_repo;

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use rusqlite::{ffi, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all entity repositories.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    ///
    /// Carries SQLite's constraint description, e.g.
    /// `UNIQUE constraint failed: members.user_id, members.workspace_id`.
    UniqueViolation(String),
    /// Row targeted by an update does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl RepoError {
    /// Whether this is a uniqueness violation on `table`.
    pub fn is_unique_violation_on(&self, table: &str) -> bool {
        match self {
            Self::UniqueViolation(detail) => detail.contains(&format!("{table}.")),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UniqueViolation(detail) => write!(f, "uniqueness violated: {detail}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, detail) = &value {
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return Self::UniqueViolation(detail.clone().unwrap_or_default());
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that were not opened through `db::open_db*`.
pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|value| parse_uuid(&value, column)).transpose()
}
