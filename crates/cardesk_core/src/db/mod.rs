//! SQLite bootstrap for the local snapshot store.
//!
//! # Responsibility
//! - Open file or in-memory connections with the pragmas the store needs.
//! - Apply schema migrations before any read or write.
//!
//! # Invariants
//! - A database written by a newer build is refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating the snapshot database.
#[derive(Debug)]
pub enum DbError {
    /// The connection itself could not be established (`file` or `memory`).
    Connect {
        mode: &'static str,
        source: rusqlite::Error,
    },
    /// A pragma or migration statement failed on an open connection.
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build; it is left untouched.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect { mode, source } => write!(f, "cannot open {mode} store: {source}"),
            Self::Sqlite(err) => write!(f, "store statement failed: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "store schema v{found} was written by a newer build (this build reads up to v{supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
