//! The owning record as seen by the validator.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::value::Value;

/// Host record the unique keys are validated on.
pub trait Record {
    /// Read a field value, bypassing any transformation.
    fn field(&self, name: &str) -> Result<Value>;

    /// Whether the record has not been persisted yet.
    fn is_new(&self) -> bool;

    /// Whether the field currently carries a validation error.
    fn has_errors(&self, field: &str) -> bool;

    /// Attach a validation error to a field.
    fn add_error(&mut self, field: &str, message: &str);

    /// Key values captured when the record was loaded from storage.
    fn loaded_keys(&self) -> Option<&Snapshot>;

    /// Store the snapshot taken by the load hook.
    fn attach_snapshot(&mut self, snapshot: Snapshot);
}

/// Key values of a record captured right after it was loaded.
///
/// Holds one entry per unique key, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    keys: Vec<Vec<Value>>,
}

impl Snapshot {
    pub(crate) fn new(keys: Vec<Vec<Value>>) -> Self {
        Self { keys }
    }

    /// Values of the key at `index`, in attribute order.
    pub fn key(&self, index: usize) -> Option<&[Value]> {
        self.keys.get(index).map(Vec::as_slice)
    }

    /// Number of keys captured.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Validation errors keyed by field name.
///
/// A field keeps each distinct message once, so repeating a validation pass
/// leaves the collection unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorBag {
    errors: BTreeMap<String, Vec<String>>,
}

impl ErrorBag {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        let messages = self.errors.entry(field.into()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    /// First message of a field.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.errors
            .get(field)
            .and_then(|m| m.first())
            .map(String::as_str)
    }

    /// All messages of a field.
    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a field has any message.
    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    /// Whether no field has a message.
    pub fn is_empty(&self) -> bool {
        self.errors.values().all(Vec::is_empty)
    }

    /// Remove all messages.
    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Iterate over fields and their messages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(f, m)| (f.as_str(), m.as_slice()))
    }
}

/// A map-backed record, used by the bundled stores.
#[derive(Debug, Clone, PartialEq)]
pub struct DynRecord {
    entity: String,
    fields: BTreeMap<String, Value>,
    persisted: bool,
    errors: ErrorBag,
    snapshot: Option<Snapshot>,
}

impl DynRecord {
    /// Create a new, unsaved record.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: BTreeMap::new(),
            persisted: false,
            errors: ErrorBag::new(),
            snapshot: None,
        }
    }

    /// Create a record materialized from storage.
    ///
    /// The load hook still has to run to capture key values.
    pub fn loaded(entity: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            fields,
            persisted: true,
            ..Self::new(entity)
        }
    }

    /// Set a field (builder style).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Get a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// All fields.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Validation errors.
    pub fn errors(&self) -> &ErrorBag {
        &self.errors
    }

    /// Mutable validation errors, for host-side rules.
    pub fn errors_mut(&mut self) -> &mut ErrorBag {
        &mut self.errors
    }

    /// First error message of a field.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.first(field)
    }

    /// Mark the record as saved.
    pub fn mark_persisted(&mut self) {
        self.persisted = true;
    }
}

impl Record for DynRecord {
    fn field(&self, name: &str) -> Result<Value> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownField {
                entity: self.entity.clone(),
                field: name.to_string(),
            })
    }

    fn is_new(&self) -> bool {
        !self.persisted
    }

    fn has_errors(&self, field: &str) -> bool {
        self.errors.has(field)
    }

    fn add_error(&mut self, field: &str, message: &str) {
        self.errors.add(field, message);
    }

    fn loaded_keys(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    fn attach_snapshot(&mut self, snapshot: Snapshot) {
        if self.snapshot.is_some() {
            debug!(entity = %self.entity, "Key snapshot already captured, keeping the first one");
            return;
        }
        self.snapshot = Some(snapshot);
    }
}
