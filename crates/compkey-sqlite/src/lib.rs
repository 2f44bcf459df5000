//! SQLite row store for compkey.
//!
//! [`SqliteStore`] answers the validator's row counts with parameterized
//! `SELECT COUNT(*)` queries, and loads and saves [`DynRecord`]s.
//!
//! [`DynRecord`]: compkey_core::DynRecord

pub mod error;
pub mod sql;
mod store;

pub use error::{Error, Result};
pub use store::SqliteStore;
