//! In-memory feed store
//!
//! A `FeedStore` owns every table of one feed and is the only way callers
//! read or change rows. Row operations work on positions, so any add or
//! delete invalidates indices the caller may be holding for that table.

use crate::codec::{parse_table, serialize_table};
use crate::error::{Error, Result};
use crate::schema::{SchemaRegistry, TABLE_SUFFIX};
use crate::table::{Row, Table};
use crate::validator::{validate_feed, ValidationReport};
use std::collections::BTreeMap;
use tracing::debug;

/// Filename to file text, as handed over by an archive reader or writer
pub type Bundle = BTreeMap<String, String>;

/// The tables of one feed, in the order they were loaded or created
#[derive(Debug, Clone)]
pub struct FeedStore<'r> {
    registry: &'r SchemaRegistry,
    tables: Vec<Table>,
}

impl<'r> FeedStore<'r> {
    /// Create a store with no files at all
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            tables: Vec::new(),
        }
    }

    /// Decode every `.txt` entry of a bundle.
    ///
    /// Entries with other suffixes are ignored. Any decode failure aborts the
    /// load; no partial feed is returned.
    pub fn load_feed<I, K, V>(registry: &'r SchemaRegistry, bundle: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut store = Self::new(registry);
        for (name, text) in bundle {
            let name = name.as_ref();
            if !name.ends_with(TABLE_SUFFIX) {
                debug!(file = name, "ignoring non-table bundle entry");
                continue;
            }
            store.load_file(name, text.as_ref())?;
        }
        debug!(files = store.tables.len(), "feed loaded");
        Ok(store)
    }

    /// A new feed: required files plus the authoring files, all empty
    pub fn create_empty(registry: &'r SchemaRegistry) -> Self {
        let mut store = Self::new(registry);
        let names = registry
            .required_files()
            .iter()
            .chain(registry.authoring_files());
        for name in names {
            if registry.is_known_file(name) {
                store.add_file(name);
            }
        }
        store
    }

    /// Decode one file's text, replacing any table already loaded under that name
    pub fn load_file(&mut self, name: &str, text: &str) -> Result<&Table> {
        let table = parse_table(name, text)?;
        debug!(file = name, rows = table.row_count(), "decoded table");
        let index = match self.position(name) {
            Some(index) => {
                self.tables[index] = table;
                index
            }
            None => {
                self.tables.push(table);
                self.tables.len() - 1
            }
        };
        Ok(&self.tables[index])
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// File names present in the feed, in load order
    pub fn file_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// All tables, in load order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Rows of one file, `None` if the file is not in the feed
    pub fn get_file_data(&self, name: &str) -> Option<&[Row]> {
        self.table(name).map(|t| t.rows.as_slice())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn get_row(&self, name: &str, index: usize) -> Option<&Row> {
        self.table(name).and_then(|t| t.get(index))
    }

    /// Ensure a table exists, creating a zero-row one if needed
    pub fn add_file(&mut self, name: &str) -> &mut Table {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                let mut table = Table::new(name);
                if let Some(schema) = self.registry.schema(name) {
                    table.columns = schema.all_fields().map(str::to_string).collect();
                }
                self.tables.push(table);
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    /// Drop a whole file from the feed
    pub fn remove_file(&mut self, name: &str) -> Option<Table> {
        let index = self.position(name)?;
        Some(self.tables.remove(index))
    }

    /// Append a row built from the schema defaults and `values`.
    ///
    /// Every schema field starts as `""`; `values` overrides them, and any
    /// field in `values` the schema does not know is kept after them.
    pub fn add_row(&mut self, name: &str, values: &Row) -> Row {
        let mut row = Row::new();
        if let Some(schema) = self.registry.schema(name) {
            for field in schema.all_fields() {
                row.set(field, values.get(field).unwrap_or(""));
            }
        }
        for (field, value) in values.iter() {
            if !row.contains(field) {
                row.set(field, value);
            }
        }

        self.add_file(name).rows.push(row.clone());
        row
    }

    /// Set one cell; false if the file or row does not exist
    pub fn update_cell(&mut self, name: &str, index: usize, field: &str, value: &str) -> bool {
        match self.table_mut(name).and_then(|t| t.get_mut(index)) {
            Some(row) => {
                row.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Remove one row, shifting later rows down; false if out of range
    pub fn delete_row(&mut self, name: &str, index: usize) -> bool {
        match self.table_mut(name) {
            Some(table) if index < table.rows.len() => {
                table.rows.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Remove several rows at once, highest index first so earlier removals
    /// do not shift later ones. Duplicates and out-of-range indices are
    /// ignored. Returns how many rows were removed.
    pub fn delete_rows(&mut self, name: &str, indices: &[usize]) -> usize {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        sorted
            .into_iter()
            .filter(|&index| self.delete_row(name, index))
            .count()
    }

    /// Serialize every table back to text, keyed by file name
    pub fn export_tables(&self) -> Bundle {
        self.tables
            .iter()
            .map(|table| {
                let schema = self.registry.schema(&table.name);
                (table.name.clone(), serialize_table(table, schema))
            })
            .collect()
    }

    /// Serialize a single table
    pub fn export_file(&self, name: &str) -> Result<String> {
        let table = self
            .table(name)
            .ok_or_else(|| Error::UnknownFile(name.to_string()))?;
        Ok(serialize_table(table, self.registry.schema(name)))
    }

    /// Run the validation engine over the current tables
    pub fn validate(&self) -> ValidationReport {
        validate_feed(self.registry, &self.tables)
    }

    /// Row count per file, in load order
    pub fn summary(&self) -> Vec<(&str, usize)> {
        self.tables
            .iter()
            .map(|t| (t.name.as_str(), t.row_count()))
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name == name)
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }
}
