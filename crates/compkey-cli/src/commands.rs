//! Subcommand implementations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use compkey_core::{Criteria, KeyRegistry, UniqueKeyValidator, UniqueKeys, Value};
use compkey_sqlite::SqliteStore;
use tracing::{debug, info};

use crate::error::CliError;
use crate::formatter::{self, OutputFormat};
use crate::Command;

/// Printed output and validity of a command.
#[derive(Debug)]
pub struct Outcome {
    pub output: String,
    pub valid: bool,
}

impl Outcome {
    /// Process exit code: 0 when valid, 2 when a check found violations.
    pub fn exit_code(&self) -> i32 {
        if self.valid {
            0
        } else {
            2
        }
    }
}

/// Run a parsed subcommand.
pub fn run(command: Command) -> Result<Outcome, CliError> {
    match command {
        Command::Keys {
            config,
            entity,
            format,
        } => keys(&config, entity.as_deref(), format),
        Command::Check {
            db,
            config,
            entity,
            record,
            key,
            format,
        } => check(&db, &config, &entity, &record, &key, format),
    }
}

fn keys(config: &Path, entity: Option<&str>, format: OutputFormat) -> Result<Outcome, CliError> {
    let registry = load_registry(config)?;

    let selected: Vec<Arc<UniqueKeys>> = match entity {
        Some(name) => vec![registry
            .get(name)
            .ok_or_else(|| CliError::UnknownEntity(name.to_string()))?],
        None => registry
            .entities()
            .iter()
            .filter_map(|name| registry.get(name))
            .collect(),
    };
    let refs: Vec<&UniqueKeys> = selected.iter().map(Arc::as_ref).collect();

    Ok(Outcome {
        output: formatter::format_keys(&refs, format)?,
        valid: true,
    })
}

fn check(
    db: &Path,
    config: &Path,
    entity: &str,
    record: &str,
    key_fields: &[String],
    format: OutputFormat,
) -> Result<Outcome, CliError> {
    let values = parse_record(record)?;
    let registry = load_registry(config)?;
    let keys = registry
        .get(entity)
        .ok_or_else(|| CliError::UnknownEntity(entity.to_string()))?;

    let store = SqliteStore::open(db)?;
    store.check_keys(&keys)?;

    let mut target = if key_fields.is_empty() {
        store.new_record(entity)?
    } else {
        let mut criteria = Criteria::new();
        for field in key_fields {
            let value = values.get(field).cloned().ok_or_else(|| {
                CliError::InvalidRecord(format!("key field '{}' is missing from the record", field))
            })?;
            criteria = criteria.with_value(field.as_str(), value);
        }
        store
            .load(&keys, &criteria)?
            .ok_or_else(|| CliError::RowNotFound {
                entity: entity.to_string(),
                criteria: criteria.to_string(),
            })?
    };

    for (field, value) in values {
        if target.get(&field).is_none() {
            return Err(CliError::InvalidRecord(format!(
                "table '{}' has no column '{}'",
                entity, field
            )));
        }
        target.set(field, value);
    }
    store.coerce_record(&mut target)?;
    debug!(entity, is_new = key_fields.is_empty(), "record prepared");

    let report = UniqueKeyValidator::new(&keys, &store).validate(&mut target)?;
    info!(
        entity,
        checked = report.checked,
        violations = report.violations.len(),
        "check finished"
    );

    Ok(Outcome {
        output: formatter::format_check(&target, &report, format)?,
        valid: report.is_valid(),
    })
}

fn load_registry(path: &Path) -> Result<KeyRegistry, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(KeyRegistry::from_json(&text)?)
}

fn parse_record(json: &str) -> Result<BTreeMap<String, Value>, CliError> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).map_err(|e| CliError::InvalidRecord(e.to_string()))?;
    let serde_json::Value::Object(map) = parsed else {
        return Err(CliError::InvalidRecord("expected a JSON object".to_string()));
    };

    let mut values = BTreeMap::new();
    for (field, raw) in map {
        let value: Value = serde_json::from_value(raw).map_err(|_| {
            CliError::InvalidRecord(format!("field '{}' must be a scalar value", field))
        })?;
        values.insert(field, value);
    }
    Ok(values)
}
