//! Per-entity registry of normalized unique keys.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::ConfigError;
use crate::keys::UniqueKeys;

/// Shared, read-mostly map from entity name to its unique keys.
///
/// Keys are normalized once per entity. Concurrent first use may normalize
/// the same declaration more than once; the first value stored wins and the
/// others are dropped.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    entities: DashMap<String, Arc<UniqueKeys>>,
}

impl KeyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object mapping entity names to key declarations.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let decls: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
                entity: "<registry>".to_string(),
                reason: e.to_string(),
            })?;

        let registry = Self::new();
        for (entity, decl) in decls {
            registry.register(UniqueKeys::from_value(entity, decl)?);
        }
        Ok(registry)
    }

    /// Register keys, replacing any previous keys of the same entity.
    pub fn register(&self, keys: UniqueKeys) -> Arc<UniqueKeys> {
        let keys = Arc::new(keys);
        debug!(entity = keys.entity(), keys = keys.len(), "Registered unique keys");
        self.entities
            .insert(keys.entity().to_string(), Arc::clone(&keys));
        keys
    }

    /// Keys of an entity.
    pub fn get(&self, entity: &str) -> Option<Arc<UniqueKeys>> {
        self.entities.get(entity).map(|k| Arc::clone(k.value()))
    }

    /// Keys of an entity, normalizing them with `init` on first use.
    pub fn get_or_try_init<F>(&self, entity: &str, init: F) -> Result<Arc<UniqueKeys>, ConfigError>
    where
        F: FnOnce() -> Result<UniqueKeys, ConfigError>,
    {
        if let Some(keys) = self.get(entity) {
            return Ok(keys);
        }

        // Built outside the map lock; a concurrent winner is kept.
        let keys = Arc::new(init()?);
        let stored = self
            .entities
            .entry(entity.to_string())
            .or_insert(keys)
            .value()
            .clone();
        Ok(stored)
    }

    /// Registered entity names, sorted.
    pub fn entities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entities.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
