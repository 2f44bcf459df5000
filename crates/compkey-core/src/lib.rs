//! compkey core - composite unique-key validation.
//!
//! This crate provides the uniqueness validator, its key declarations, and the
//! traits through which it reaches the owning record and the row store.

pub mod criteria;
pub mod error;
pub mod keys;
pub mod record;
pub mod registry;
pub mod store;
pub mod validator;
pub mod value;

pub use criteria::{Condition, Criteria};
pub use error::{ConfigError, Error, Result};
pub use keys::{ErrorTarget, KeySpec, UniqueKeys};
pub use record::{DynRecord, ErrorBag, Record, Snapshot};
pub use registry::KeyRegistry;
pub use store::{MemoryStore, Row, RowCounter};
pub use validator::{Report, UniqueKeyValidator, Violation};
pub use value::Value;
