//! Core error types.

use thiserror::Error;

/// Boxed error raised by a host collaborator (row store, field accessor).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the validator and its collaborators.
///
/// A uniqueness violation is not an error: it is reported on the record and
/// in the [`Report`](crate::Report).
#[derive(Debug, Error)]
pub enum Error {
    /// Key declarations could not be normalized.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A key attribute does not exist on the record.
    #[error("unknown field '{field}' on {entity}")]
    UnknownField {
        /// Entity the record belongs to.
        entity: String,
        /// Requested field.
        field: String,
    },

    /// The row store failed to answer a count.
    #[error("storage error: {0}")]
    Storage(#[source] BoxError),
}

impl Error {
    /// Wrap a row store failure, keeping it as the error source.
    pub fn storage(err: impl Into<BoxError>) -> Self {
        Error::Storage(err.into())
    }
}

/// Malformed unique key declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The declaration is neither a key nor a list of keys.
    #[error("wrong unique keys format for {entity}: {reason}")]
    Malformed {
        /// Entity the declaration belongs to.
        entity: String,
        /// Parser message.
        reason: String,
    },

    /// A key declares no attributes.
    #[error("unique key #{key} of {entity} has no attributes")]
    EmptyAttributes {
        /// Entity the key belongs to.
        entity: String,
        /// Key position in declaration order.
        key: usize,
    },

    /// A field list contains an empty name (e.g. `"email,"`).
    #[error("unique key #{key} of {entity} contains an empty field name")]
    EmptyFieldName {
        /// Entity the key belongs to.
        entity: String,
        /// Key position in declaration order.
        key: usize,
    },

    /// The same attribute appears twice in one key.
    #[error("unique key #{key} of {entity} lists attribute '{field}' twice")]
    DuplicateAttribute {
        /// Entity the key belongs to.
        entity: String,
        /// Key position in declaration order.
        key: usize,
        /// Repeated attribute.
        field: String,
    },

    /// A key attribute is not a field of the entity.
    #[error("unique key #{key} of {entity} references unknown field '{field}'")]
    UnknownAttribute {
        /// Entity the key belongs to.
        entity: String,
        /// Key position in declaration order.
        key: usize,
        /// Missing field.
        field: String,
    },
}
