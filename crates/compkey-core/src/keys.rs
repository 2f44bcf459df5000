//! Composite unique key declarations.
//!
//! A [`UniqueKeys`] value is the normalized, immutable list of [`KeySpec`]s of
//! one entity. It is built either from typed specs or from a JSON declaration
//! in which every field list may be written as an array or as a
//! comma-separated string:
//!
//! ```json
//! [
//!     {
//!         "attributes": "email, applicationId",
//!         "errorMessage": "This email is already registered",
//!         "errorAttributes": "email",
//!         "skipOnErrorIn": ["email", "applicationId"]
//!     }
//! ]
//! ```
//!
//! A single key may also be declared on its own, without the surrounding list.

use std::collections::HashSet;
use std::slice;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where the error message of a violated key is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTarget {
    /// Attach the message to each listed field. An empty list attaches nothing.
    Fields(Vec<String>),
    /// Attach the message to no field.
    Detached,
}

impl ErrorTarget {
    /// Fields that receive the error message.
    pub fn fields(&self) -> &[String] {
        match self {
            ErrorTarget::Fields(fields) => fields,
            ErrorTarget::Detached => &[],
        }
    }
}

/// One composite uniqueness rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySpec {
    attributes: Vec<String>,
    error_message: String,
    error_target: ErrorTarget,
    skip_on_error_in: Vec<String>,
}

impl KeySpec {
    /// Create a key over the given attributes.
    ///
    /// The error message is attached to no field until
    /// [`with_error_fields`](Self::with_error_fields) is called.
    pub fn new(
        attributes: impl IntoIterator<Item = impl Into<String>>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            error_message: error_message.into(),
            error_target: ErrorTarget::Detached,
            skip_on_error_in: Vec::new(),
        }
    }

    /// Attach the error message to these fields on violation.
    pub fn with_error_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.error_target = ErrorTarget::Fields(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Skip this key while any of these fields already has an error.
    pub fn skip_on_error_in(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skip_on_error_in = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Fields that make up the key, in declaration order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Message attached on violation.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Where the message is attached.
    pub fn error_target(&self) -> &ErrorTarget {
        &self.error_target
    }

    /// Fields whose errors suppress this key.
    pub fn skip_fields(&self) -> &[String] {
        &self.skip_on_error_in
    }

    fn check(&self, entity: &str, key: usize) -> Result<(), ConfigError> {
        if self.attributes.is_empty() {
            return Err(ConfigError::EmptyAttributes {
                entity: entity.to_string(),
                key,
            });
        }

        let mut named = self
            .attributes
            .iter()
            .chain(self.error_target.fields())
            .chain(&self.skip_on_error_in);
        if named.any(|f| f.is_empty()) {
            return Err(ConfigError::EmptyFieldName {
                entity: entity.to_string(),
                key,
            });
        }

        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.as_str()) {
                return Err(ConfigError::DuplicateAttribute {
                    entity: entity.to_string(),
                    key,
                    field: attr.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Normalized unique keys of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueKeys {
    entity: String,
    keys: Vec<KeySpec>,
}

impl UniqueKeys {
    /// Build from typed key specs, checking each one.
    pub fn new(entity: impl Into<String>, keys: Vec<KeySpec>) -> Result<Self, ConfigError> {
        let entity = entity.into();
        for (index, spec) in keys.iter().enumerate() {
            spec.check(&entity, index)?;
        }
        Ok(Self { entity, keys })
    }

    /// Parse a JSON declaration (a single key or a list of keys).
    pub fn from_json(entity: impl Into<String>, json: &str) -> Result<Self, ConfigError> {
        let entity = entity.into();
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
                entity: entity.clone(),
                reason: e.to_string(),
            })?;
        Self::from_value(entity, value)
    }

    /// Normalize an already parsed JSON declaration.
    pub fn from_value(
        entity: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<Self, ConfigError> {
        let entity = entity.into();
        if !value.is_array() && !value.is_object() {
            return Err(ConfigError::Malformed {
                entity,
                reason: format!("expected a key or a list of keys, found {}", json_kind(&value)),
            });
        }

        let decl: KeysDecl = serde_json::from_value(value).map_err(|e| ConfigError::Malformed {
            entity: entity.clone(),
            reason: e.to_string(),
        })?;

        let decls = match decl {
            KeysDecl::Many(list) => list,
            KeysDecl::One(single) => vec![single],
        };
        let keys = decls.into_iter().map(KeyDecl::into_spec).collect();
        Self::new(entity, keys)
    }

    /// Entity these keys belong to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Key specs in declaration order.
    pub fn keys(&self) -> &[KeySpec] {
        &self.keys
    }

    /// Iterate over the key specs.
    pub fn iter(&self) -> slice::Iter<'_, KeySpec> {
        self.keys.iter()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if no keys are declared.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify that every key attribute is one of `fields`.
    pub fn check_fields<S: AsRef<str>>(&self, fields: &[S]) -> Result<(), ConfigError> {
        for (index, spec) in self.keys.iter().enumerate() {
            for attr in spec.attributes() {
                if !fields.iter().any(|f| f.as_ref() == attr) {
                    return Err(ConfigError::UnknownAttribute {
                        entity: self.entity.clone(),
                        key: index,
                        field: attr.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a UniqueKeys {
    type Item = &'a KeySpec;
    type IntoIter = slice::Iter<'a, KeySpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Declaration as written in configuration: one key or several.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeysDecl {
    Many(Vec<KeyDecl>),
    One(KeyDecl),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct KeyDecl {
    attributes: FieldList,
    #[serde(alias = "error_message")]
    error_message: String,
    #[serde(default, alias = "error_attributes")]
    error_attributes: Option<FieldList>,
    #[serde(default, alias = "skip_on_error_in")]
    skip_on_error_in: Option<FieldList>,
}

/// A field list written as an array or as a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldList {
    List(Vec<String>),
    Csv(String),
}

impl FieldList {
    fn into_fields(self) -> Vec<String> {
        match self {
            FieldList::List(list) => list.into_iter().map(|f| f.trim().to_string()).collect(),
            FieldList::Csv(csv) if csv.trim().is_empty() => Vec::new(),
            FieldList::Csv(csv) => csv.split(',').map(|f| f.trim().to_string()).collect(),
        }
    }
}

impl KeyDecl {
    fn into_spec(self) -> KeySpec {
        let mut spec = KeySpec::new(self.attributes.into_fields(), self.error_message);
        if let Some(fields) = self.error_attributes {
            spec = spec.with_error_fields(fields.into_fields());
        }
        if let Some(fields) = self.skip_on_error_in {
            spec = spec.skip_on_error_in(fields.into_fields());
        }
        spec
    }
}
