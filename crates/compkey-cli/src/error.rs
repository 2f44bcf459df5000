//! CLI errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by the command-line client.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Key declarations are malformed.
    #[error(transparent)]
    Config(#[from] compkey_core::ConfigError),

    /// Validation failed to run.
    #[error(transparent)]
    Core(#[from] compkey_core::Error),

    /// The SQLite store failed.
    #[error(transparent)]
    Store(#[from] compkey_sqlite::Error),

    /// Output could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The record argument is not usable.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// No keys are declared for the entity.
    #[error("no unique keys declared for entity '{0}'")]
    UnknownEntity(String),

    /// No stored row matches the `--key` fields.
    #[error("no {entity} row matches {criteria}")]
    RowNotFound {
        /// Entity searched.
        entity: String,
        /// Rendered search criteria.
        criteria: String,
    },
}
