//! SQLite store errors.

use thiserror::Error;

/// Result alias for store operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// SQLite store errors.
#[derive(Debug, Error)]
pub enum Error {
    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Validator or configuration error.
    #[error(transparent)]
    Core(#[from] compkey_core::Error),

    /// The table does not exist.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A table or column name cannot be quoted.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A stored value has no field value equivalent.
    #[error("unsupported value in column '{column}': {kind}")]
    UnsupportedValue {
        /// Column the value was read from.
        column: String,
        /// SQLite storage class.
        kind: &'static str,
    },
}

impl From<compkey_core::ConfigError> for Error {
    fn from(err: compkey_core::ConfigError) -> Self {
        Error::Core(err.into())
    }
}
