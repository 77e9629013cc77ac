//! # Repository Error Types
//!
//! Failures of the libsql-backed repository. Conflicts on natural keys are
//! resolved by upserts and never surface here.

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for repository operations
#[derive(Debug, Error)]
pub enum DbError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Row decoding error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// A referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<DbError> for CrateError {
    fn from(err: DbError) -> Self {
        CrateError::Database(err.to_string())
    }
}
