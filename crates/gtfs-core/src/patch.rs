//! Edit scripts for feeds
//!
//! This module provides:
//! - A JSON edit format (add row / update cell / delete row)
//! - Patch application against a `FeedStore`, collecting failed edits
//! - Batch files that apply several patches to one feed directory

use crate::error::{Error, Result};
use crate::feed::FeedStore;
use crate::table::Row;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A single edit to a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    /// Append a row; unspecified schema fields default to empty
    AddRow {
        file: String,
        #[serde(default)]
        values: Row,
    },
    /// Set one cell of an existing row (row is 0-based)
    UpdateCell {
        file: String,
        row: usize,
        field: String,
        value: String,
    },
    /// Remove a row (row is 0-based)
    DeleteRow { file: String, row: usize },
}

impl Edit {
    pub fn add_row(file: impl Into<String>, values: Row) -> Self {
        Edit::AddRow {
            file: file.into(),
            values,
        }
    }

    pub fn update_cell(
        file: impl Into<String>,
        row: usize,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Edit::UpdateCell {
            file: file.into(),
            row,
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn delete_row(file: impl Into<String>, row: usize) -> Self {
        Edit::DeleteRow {
            file: file.into(),
            row,
        }
    }

    /// File the edit targets
    pub fn file(&self) -> &str {
        match self {
            Edit::AddRow { file, .. } | Edit::UpdateCell { file, .. } | Edit::DeleteRow { file, .. } => {
                file
            }
        }
    }
}

/// An ordered list of edits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchFile {
    /// Free-form note shown when the patch is applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Edits, applied in order
    pub edits: Vec<Edit>,
}

impl PatchFile {
    /// Create a new empty patch file
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edit to the patch
    pub fn add_edit(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Load a patch file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the patch file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// A batch file: several patches applied to one feed directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFile {
    /// Directory holding the unpacked feed
    pub feed_dir: PathBuf,
    /// Output directory for the exported feed
    pub output_dir: PathBuf,
    /// Patch files to apply, in order
    pub patches: Vec<PathBuf>,
}

impl BatchFile {
    /// Load a batch file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the batch file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Outcome of applying a patch
#[derive(Debug, Clone, Default)]
pub struct PatchResult {
    /// Number of edits applied
    pub applied: usize,
    /// Edits that failed, with the reason
    pub failed: Vec<(Edit, String)>,
}

impl PatchResult {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Apply every edit in order. A failed edit is recorded and skipped; the
/// remaining edits still run against the updated feed.
pub fn apply_patch(store: &mut FeedStore<'_>, patch: &PatchFile) -> PatchResult {
    let mut result = PatchResult::default();

    for edit in &patch.edits {
        let outcome = match edit {
            Edit::AddRow { file, values } => {
                store.add_row(file, values);
                Ok(())
            }
            Edit::UpdateCell {
                file,
                row,
                field,
                value,
            } => {
                if !store.has_file(file) {
                    Err(format!("File '{}' not in feed", file))
                } else if store.update_cell(file, *row, field, value) {
                    Ok(())
                } else {
                    Err(format!("Row {} out of range", row))
                }
            }
            Edit::DeleteRow { file, row } => {
                if !store.has_file(file) {
                    Err(format!("File '{}' not in feed", file))
                } else if store.delete_row(file, *row) {
                    Ok(())
                } else {
                    Err(format!("Row {} out of range", row))
                }
            }
        };

        match outcome {
            Ok(()) => result.applied += 1,
            Err(reason) => {
                warn!(file = edit.file(), %reason, "edit not applied");
                result.failed.push((edit.clone(), reason));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use tempfile::TempDir;

    fn values(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_edit_json_format() {
        let json = r#"{"edits": [
            {"op": "add_row", "file": "stops.txt", "values": {"stop_id": "S9"}},
            {"op": "update_cell", "file": "stops.txt", "row": 0, "field": "stop_name", "value": "Main"},
            {"op": "delete_row", "file": "stops.txt", "row": 3}
        ]}"#;
        let patch: PatchFile = serde_json::from_str(json).unwrap();

        assert_eq!(patch.edits.len(), 3);
        assert_eq!(patch.edits[0], Edit::add_row("stops.txt", values(&[("stop_id", "S9")])));
        assert_eq!(patch.edits[1], Edit::update_cell("stops.txt", 0, "stop_name", "Main"));
        assert_eq!(patch.edits[2], Edit::delete_row("stops.txt", 3));
    }

    #[test]
    fn test_apply_patch_collects_failures() {
        let mut store = FeedStore::new(SchemaRegistry::gtfs());
        let mut patch = PatchFile::new();
        patch.add_edit(Edit::add_row("stops.txt", values(&[("stop_id", "S1")])));
        patch.add_edit(Edit::update_cell("stops.txt", 0, "stop_name", "Main St"));
        patch.add_edit(Edit::update_cell("stops.txt", 4, "stop_name", "Nowhere"));
        patch.add_edit(Edit::delete_row("routes.txt", 0));
        patch.add_edit(Edit::add_row("stops.txt", values(&[("stop_id", "S2")])));

        let result = apply_patch(&mut store, &patch);

        assert_eq!(result.applied, 3);
        assert_eq!(result.failed.len(), 2);
        assert_eq!(result.failed[0].1, "Row 4 out of range");
        assert_eq!(result.failed[1].1, "File 'routes.txt' not in feed");
        assert_eq!(store.get_file_data("stops.txt").unwrap().len(), 2);
        assert_eq!(
            store.get_row("stops.txt", 0).unwrap().get("stop_name"),
            Some("Main St")
        );
    }

    #[test]
    fn test_patch_file_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patch.json");

        let mut patch = PatchFile::new();
        patch.description = Some("rename stop".to_string());
        patch.add_edit(Edit::update_cell("stops.txt", 0, "stop_name", "Elm"));
        patch.save(&path).unwrap();

        assert_eq!(PatchFile::load(&path).unwrap(), patch);
    }

    #[test]
    fn test_batch_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.json");

        let batch = BatchFile {
            feed_dir: PathBuf::from("feed"),
            output_dir: PathBuf::from("out"),
            patches: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
        };
        batch.save(&path).unwrap();

        let loaded = BatchFile::load(&path).unwrap();
        assert_eq!(loaded.feed_dir, batch.feed_dir);
        assert_eq!(loaded.patches.len(), 2);
    }
}
