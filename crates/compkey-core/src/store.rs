//! Row counting capability and an in-memory row store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use crate::criteria::Criteria;
use crate::error::Result;
use crate::record::DynRecord;
use crate::value::Value;

/// A stored row: field name to value.
pub type Row = BTreeMap<String, Value>;

/// Counts persisted rows of an entity matching every condition of a criteria.
pub trait RowCounter {
    /// Count matching rows as currently visible to the store.
    fn count(&self, entity: &str, criteria: &Criteria) -> Result<u64>;
}

impl<T: RowCounter + ?Sized> RowCounter for &T {
    fn count(&self, entity: &str, criteria: &Criteria) -> Result<u64> {
        (**self).count(entity, criteria)
    }
}

/// In-memory row store.
///
/// Rows are kept per entity in insertion order. Counts scan every row of the
/// entity.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, Vec<Row>>>,
    counts: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    pub fn insert(&self, entity: impl Into<String>, row: Row) {
        self.rows.write().entry(entity.into()).or_default().push(row);
    }

    /// Append a row given as field/value pairs.
    pub fn insert_values<K, V>(&self, entity: impl Into<String>, values: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let row = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert(entity, row);
    }

    /// Persist a record's fields and mark it saved.
    pub fn save(&self, record: &mut DynRecord) {
        self.insert(record.entity().to_string(), record.fields().clone());
        record.mark_persisted();
    }

    /// Load the first row matching `criteria` as a persisted record.
    ///
    /// The load hook is not run here.
    pub fn find(&self, entity: &str, criteria: &Criteria) -> Option<DynRecord> {
        let rows = self.rows.read();
        rows.get(entity)?
            .iter()
            .find(|row| criteria.matches(row))
            .map(|row| DynRecord::loaded(entity, row.clone()))
    }

    /// Number of rows stored for an entity.
    pub fn len(&self, entity: &str) -> usize {
        self.rows.read().get(entity).map_or(0, Vec::len)
    }

    /// Check if an entity has no rows.
    pub fn is_empty(&self, entity: &str) -> bool {
        self.len(entity) == 0
    }

    /// Number of count queries served so far.
    pub fn count_calls(&self) -> u64 {
        self.counts.load(Ordering::Relaxed)
    }
}

impl RowCounter for MemoryStore {
    fn count(&self, entity: &str, criteria: &Criteria) -> Result<u64> {
        self.counts.fetch_add(1, Ordering::Relaxed);

        let rows = self.rows.read();
        let count = rows
            .get(entity)
            .map_or(0, |rows| rows.iter().filter(|row| criteria.matches(row)).count())
            as u64;

        trace!(entity, criteria = %criteria, count, "Counted rows");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_with_null_condition() {
        let store = MemoryStore::new();
        store.insert_values("news", [("title", Value::from("A")), ("categoryId", Value::Null)]);
        store.insert_values("news", [("title", Value::from("A")), ("categoryId", Value::Int(2))]);
        store.insert_values("other", [("title", Value::from("A")), ("categoryId", Value::Null)]);

        let criteria = Criteria::new()
            .with_value("title", "A")
            .with_value("categoryId", Value::Null);
        assert_eq!(store.count("news", &criteria).unwrap(), 1);

        let criteria = Criteria::new().with_value("title", "A");
        assert_eq!(store.count("news", &criteria).unwrap(), 2);
        assert_eq!(store.count("missing", &criteria).unwrap(), 0);
        assert_eq!(store.count_calls(), 3);
    }

    #[test]
    fn test_save_and_find() {
        let store = MemoryStore::new();
        let mut record = DynRecord::new("user").with("id", 1).with("login", "bob");
        store.save(&mut record);
        assert_eq!(store.len("user"), 1);

        let found = store
            .find("user", &Criteria::new().with_value("id", 1))
            .unwrap();
        assert_eq!(found.get("login"), Some(&Value::from("bob")));
        assert!(store.find("user", &Criteria::new().with_value("id", 2)).is_none());
    }
}
