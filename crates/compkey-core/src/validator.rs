//! Composite unique key validation.
//!
//! The [`UniqueKeyValidator`] checks every key of an entity against the
//! persisted rows through a [`RowCounter`]:
//! - a new record may not match any stored row
//! - a loaded record whose key values are unchanged may match one row (itself)
//! - a loaded record whose key values changed may not match any row

use serde::Serialize;
use tracing::{debug, trace};

use crate::criteria::Criteria;
use crate::error::Result;
use crate::keys::{ErrorTarget, KeySpec, UniqueKeys};
use crate::record::{Record, Snapshot};
use crate::store::RowCounter;
use crate::value::Value;

/// A violated unique key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Key position in declaration order.
    pub key: usize,
    /// Key attributes.
    pub attributes: Vec<String>,
    /// Error message of the key.
    pub message: String,
    /// Where the message was attached.
    pub target: ErrorTarget,
    /// Number of matching stored rows.
    pub matches: u64,
    /// Number of matching rows that was allowed.
    pub allowed: u64,
}

/// Outcome of one validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Entity validated.
    pub entity: String,
    /// Number of keys that were queried.
    pub checked: usize,
    /// Keys skipped because a `skip_on_error_in` field had errors.
    pub skipped: Vec<usize>,
    /// Violated keys.
    pub violations: Vec<Violation>,
}

impl Report {
    fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            checked: 0,
            skipped: Vec::new(),
            violations: Vec::new(),
        }
    }

    /// Whether no key was violated.
    ///
    /// A key attached to no field still makes the report invalid.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validator for the unique keys of one entity.
pub struct UniqueKeyValidator<'a, C: ?Sized> {
    keys: &'a UniqueKeys,
    counter: &'a C,
}

impl<'a, C: RowCounter + ?Sized> UniqueKeyValidator<'a, C> {
    /// Create a validator over `keys`, counting rows through `counter`.
    pub fn new(keys: &'a UniqueKeys, counter: &'a C) -> Self {
        Self { keys, counter }
    }

    /// Keys being validated.
    pub fn keys(&self) -> &UniqueKeys {
        self.keys
    }

    /// Read the current values of every key from the record.
    pub fn capture<R: Record + ?Sized>(&self, record: &R) -> Result<Snapshot> {
        let keys = self
            .keys
            .iter()
            .map(|spec| key_values(record, spec))
            .collect::<Result<Vec<_>>>()?;
        Ok(Snapshot::new(keys))
    }

    /// Load hook: capture key values of a record just read from storage.
    pub fn after_load<R: Record + ?Sized>(&self, record: &mut R) -> Result<()> {
        let snapshot = self.capture(record)?;
        record.attach_snapshot(snapshot);
        Ok(())
    }

    /// Validate every key of the record.
    ///
    /// Violations are attached to the record's fields and listed in the
    /// returned report. Field access and row count failures are returned as
    /// errors.
    ///
    /// Errors added by an earlier pass are not removed; the host clears them
    /// before validating again, or a stale message can trigger a skip.
    pub fn validate<R: Record + ?Sized>(&self, record: &mut R) -> Result<Report> {
        let entity = self.keys.entity();
        let mut report = Report::new(entity);

        for (index, spec) in self.keys.iter().enumerate() {
            if let Some(field) = spec.skip_fields().iter().find(|f| record.has_errors(f)) {
                debug!(entity, key = index, field = %field, "Skipping unique key, field has errors");
                report.skipped.push(index);
                continue;
            }

            let current = key_values(record, spec)?;
            let criteria = Criteria::for_key(spec.attributes(), &current);
            let allowed = allowed_matches(record, index, &current);

            let matches = self.counter.count(entity, &criteria)?;
            report.checked += 1;
            trace!(entity, key = index, criteria = %criteria, matches, allowed, "Checked unique key");

            if matches > allowed {
                debug!(
                    entity,
                    key = index,
                    criteria = %criteria,
                    matches,
                    allowed,
                    "Unique key violated"
                );
                for field in spec.error_target().fields() {
                    record.add_error(field, spec.error_message());
                }
                report.violations.push(Violation {
                    key: index,
                    attributes: spec.attributes().to_vec(),
                    message: spec.error_message().to_string(),
                    target: spec.error_target().clone(),
                    matches,
                    allowed,
                });
            }
        }

        Ok(report)
    }
}

fn key_values<R: Record + ?Sized>(record: &R, spec: &KeySpec) -> Result<Vec<Value>> {
    spec.attributes()
        .iter()
        .map(|attr| record.field(attr))
        .collect()
}

/// Matching rows tolerated for a key: the record itself when it was loaded
/// and the key values still select the rows they selected at load time.
fn allowed_matches<R: Record + ?Sized>(record: &R, index: usize, current: &[Value]) -> u64 {
    if record.is_new() {
        return 0;
    }
    match record.loaded_keys().and_then(|s| s.key(index)) {
        Some(old) if old.len() == current.len()
            && old.iter().zip(current).all(|(a, b)| a.same_key(b)) =>
        {
            1
        }
        _ => 0,
    }
}
