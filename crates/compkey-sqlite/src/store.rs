//! SQLite-backed row store.

use std::path::Path;

use compkey_core::{Criteria, DynRecord, Row, RowCounter, UniqueKeyValidator, UniqueKeys};
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::sql::{coerce, count_query, from_sql, quote_ident, select_query, to_sql, Affinity};

/// Row store over an SQLite connection.
///
/// Entity names map to table names and field names to column names.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Opened SQLite store");
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Run a batch of SQL statements (schema setup, fixtures).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Column names of a table, in declaration order.
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .column_types(table)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Column names of a table with their type affinity.
    pub fn column_types(&self, table: &str) -> Result<Vec<(String, Affinity)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let decl: String = row.get(1)?;
                Ok((name, Affinity::from_decl(&decl)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(Error::UnknownTable(table.to_string()));
        }
        Ok(columns)
    }

    /// Convert every field of a record to the value its column would store.
    ///
    /// Run before validating values that did not come from the database, so
    /// that a key compares against its load-time values the way SQLite
    /// compares it against stored rows.
    pub fn coerce_record(&self, record: &mut DynRecord) -> Result<()> {
        for (column, affinity) in self.column_types(record.entity())? {
            if let Some(value) = record.get(&column).cloned() {
                record.set(column, coerce(affinity, value));
            }
        }
        Ok(())
    }

    /// Verify that every key attribute is a column of the entity's table.
    pub fn check_keys(&self, keys: &UniqueKeys) -> Result<()> {
        let columns = self.columns(keys.entity())?;
        keys.check_fields(columns.as_slice())?;
        Ok(())
    }

    /// A new record for `table` with every column set to null.
    pub fn new_record(&self, table: &str) -> Result<DynRecord> {
        let mut record = DynRecord::new(table);
        for column in self.columns(table)? {
            record.set(column, compkey_core::Value::Null);
        }
        Ok(record)
    }

    /// Count rows of `table` matching `criteria`.
    pub fn count_rows(&self, table: &str, criteria: &Criteria) -> Result<u64> {
        let (sql, params) = count_query(table, criteria)?;
        trace!(sql = %sql, "Counting rows");

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Load the first row of `table` matching `criteria`.
    ///
    /// The returned record is marked persisted but carries no key snapshot;
    /// use [`load`](Self::load) to also run the load hook.
    pub fn find(&self, table: &str, criteria: &Criteria) -> Result<Option<DynRecord>> {
        let (sql, params) = select_query(table, criteria)?;
        debug!(sql = %sql, "Finding row");

        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut fields = Row::new();
        for (i, name) in names.iter().enumerate() {
            fields.insert(name.clone(), from_sql(name, row.get_ref(i)?)?);
        }
        Ok(Some(DynRecord::loaded(table, fields)))
    }

    /// Load a record of the keys' entity and capture its key values.
    pub fn load(&self, keys: &UniqueKeys, criteria: &Criteria) -> Result<Option<DynRecord>> {
        let Some(mut record) = self.find(keys.entity(), criteria)? else {
            return Ok(None);
        };
        UniqueKeyValidator::new(keys, self).after_load(&mut record)?;
        Ok(Some(record))
    }

    /// Insert a record into its entity's table and mark it persisted.
    pub fn insert(&self, record: &mut DynRecord) -> Result<()> {
        let table = quote_ident(record.entity())?;
        let sql = if record.fields().is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            let columns = record
                .fields()
                .keys()
                .map(|c| quote_ident(c))
                .collect::<Result<Vec<_>>>()?;
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        debug!(sql = %sql, "Inserting row");

        let params = record.fields().values().map(to_sql);
        self.conn.execute(&sql, params_from_iter(params))?;
        record.mark_persisted();
        Ok(())
    }

    /// Update the row identified by the record's `primary_key` fields.
    ///
    /// Returns the number of rows changed.
    pub fn update(&self, record: &DynRecord, primary_key: &[&str]) -> Result<usize> {
        let mut set = Vec::new();
        let mut params = Vec::new();
        for (column, value) in record.fields() {
            if primary_key.contains(&column.as_str()) {
                continue;
            }
            params.push(to_sql(value));
            set.push(format!("{} = ?{}", quote_ident(column)?, params.len()));
        }
        if set.is_empty() {
            return Ok(0);
        }

        let mut filter = Vec::with_capacity(primary_key.len());
        for column in primary_key {
            let value = record.get(column).cloned().unwrap_or(compkey_core::Value::Null);
            params.push(to_sql(&value));
            filter.push(format!("{} = ?{}", quote_ident(column)?, params.len()));
        }

        let mut sql = format!("UPDATE {} SET {}", quote_ident(record.entity())?, set.join(", "));
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.join(" AND "));
        }
        debug!(sql = %sql, "Updating row");

        Ok(self.conn.execute(&sql, params_from_iter(params.iter()))?)
    }

    /// All rows of a table, in rowid order.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        let sql = format!("SELECT * FROM {}", quote_ident(table)?);
        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Row::new();
            for (i, name) in names.iter().enumerate() {
                fields.insert(name.clone(), from_sql(name, row.get_ref(i)?)?);
            }
            out.push(fields);
        }
        Ok(out)
    }
}

impl RowCounter for SqliteStore {
    fn count(&self, entity: &str, criteria: &Criteria) -> compkey_core::Result<u64> {
        self.count_rows(entity, criteria)
            .map_err(compkey_core::Error::storage)
    }
}
