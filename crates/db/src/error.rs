//! Error types for the database helper

use thiserror::Error;

use crate::config::DbType;

/// Result type alias for database helper operations
pub type Result<T> = std::result::Result<T, DbError>;

/// Errors that can occur while talking to a database
#[derive(Debug, Error)]
pub enum DbError {
    /// Database type string not recognised
    #[error("unknown database type: {0}")]
    UnknownDbType(String),

    /// A required connection setting is missing
    #[error("missing {setting} in {db_type} configuration")]
    MissingConfig {
        db_type: DbType,
        setting: &'static str,
    },

    /// Backend was not compiled in
    #[error("{0} support is not enabled in this build")]
    BackendUnavailable(DbType),

    /// `open` called on a helper that is already connected
    #[error("connection has not been closed")]
    AlreadyOpen,

    /// Operation needs an open connection
    #[error("connection is not open")]
    NotOpen,

    /// Column value could not be mapped to a [`DbValue`](crate::DbValue)
    #[error("unsupported type {type_name} in column {column}")]
    UnsupportedType { column: String, type_name: String },

    /// Driver error from sqlx
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Driver error from the Oracle client
    #[error("oracle error: {0}")]
    Oracle(String),

    /// Blocking driver call did not complete
    #[error("driver task failed: {0}")]
    Driver(String),
}

#[cfg(feature = "oracle")]
impl From<oracle::Error> for DbError {
    fn from(err: oracle::Error) -> Self {
        DbError::Oracle(err.to_string())
    }
}
