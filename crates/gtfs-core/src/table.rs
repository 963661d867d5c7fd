//! Core table types for representing feed files

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A parsed table for a single feed file (e.g. `stops.txt`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// File name, including the `.txt` suffix
    pub name: String,
    /// Header order: from the parsed file, or the schema order for files
    /// created in memory
    pub columns: Vec<String>,
    /// Row data, in file order
    pub rows: Vec<Row>,
    /// Data lines dropped while parsing because their width did not match the header
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_lines: Vec<DroppedLine>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get the number of parsed header columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a row by position
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Get a mutable row by position
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }
}

/// A data line the codec refused to turn into a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedLine {
    /// 1-based record number in the source text, header included
    pub line: usize,
    /// Number of header fields
    pub expected: usize,
    /// Number of fields found on the line
    pub found: usize,
}

/// One record of a table: field names mapped to raw string values.
///
/// Keeps insertion order so re-export is deterministic. A field that was
/// never set is absent, which is different from a field set to `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    entries: Vec<(String, String)>,
}

impl Row {
    /// Create a new empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by field name
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Check whether the field is present (even if empty)
    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    /// Set a field, replacing the value in place if it already exists
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    /// Remove a field, returning its value if it was present
    pub fn remove(&mut self, field: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(name, _)| name == field)?;
        Some(self.entries.remove(pos).1)
    }

    /// Field names in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(field, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (field, value) in iter {
            row.set(field, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Row, A::Error> {
                let mut row = Row::new();
                while let Some((field, value)) = access.next_entry::<String, String>()? {
                    row.set(field, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_replaces_in_place() {
        let mut row: Row = [("stop_id", "S1"), ("stop_name", "Main")].into_iter().collect();
        row.set("stop_id", "S2");
        row.set("stop_lat", "40.7");

        let fields: Vec<&str> = row.fields().collect();
        assert_eq!(fields, vec!["stop_id", "stop_name", "stop_lat"]);
        assert_eq!(row.get("stop_id"), Some("S2"));
    }

    #[test]
    fn test_row_absent_vs_empty() {
        let mut row = Row::new();
        row.set("stop_desc", "");

        assert!(row.contains("stop_desc"));
        assert_eq!(row.get("stop_desc"), Some(""));
        assert!(!row.contains("stop_code"));
        assert_eq!(row.get("stop_code"), None);
    }

    #[test]
    fn test_row_remove() {
        let mut row: Row = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(row.remove("a"), Some("1".to_string()));
        assert_eq!(row.remove("a"), None);
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_row_json_keeps_field_order() {
        let row: Row = [("zeta", "1"), ("alpha", "2")].into_iter().collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);

        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_table_accessors() {
        let mut table = Table::new("stops.txt");
        assert!(table.is_empty());

        table.rows.push([("stop_id", "S1")].into_iter().collect());
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.get(0).and_then(|r| r.get("stop_id")), Some("S1"));
        assert!(table.get(1).is_none());
    }
}
