//! Local SQLite database for device-only state.
//!
//! # Responsibility
//! - Open the preferences database and bring its schema up to date.
//!
//! # Invariants
//! - Schema version is `PRAGMA user_version`; a file written by a newer
//!   build is refused rather than downgraded.
//! - Household records never land here. Only device preferences do.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating the preferences database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
    /// One migration step failed; earlier steps stay applied.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
}

impl DbError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "db_sqlite_failed",
            Self::SchemaTooNew { .. } => "db_schema_unsupported",
            Self::Migration { .. } => "db_migration_failed",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "preferences database error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "preferences schema version {found} is newer than supported {supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "preferences migration {version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
