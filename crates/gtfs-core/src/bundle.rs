//! Reading and writing an unpacked feed directory
//!
//! Archive containers are handled elsewhere; this module only deals with a
//! directory that already holds the extracted `.txt` files.

use crate::error::{Error, Result};
use crate::feed::Bundle;
use crate::schema::TABLE_SUFFIX;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Read every `*.txt` file directly inside `dir` into a bundle
pub fn read_bundle_dir<P: AsRef<Path>>(dir: P) -> Result<Bundle> {
    let dir = dir.as_ref();
    let mut bundle = Bundle::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping file with non UTF-8 name");
            continue;
        };
        if !file_name.ends_with(TABLE_SUFFIX) {
            continue;
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        bundle.insert(file_name.to_string(), content);
    }

    debug!(dir = %dir.display(), files = bundle.len(), "read feed directory");
    Ok(bundle)
}

/// Write each bundle entry as a file in `dir`, creating the directory.
/// Returns the paths written, in bundle order.
pub fn write_bundle_dir<P: AsRef<Path>>(dir: P, bundle: &Bundle) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(bundle.len());
    for (name, content) in bundle {
        let path = dir.join(name);
        fs::write(&path, content)?;
        written.push(path);
    }

    debug!(dir = %dir.display(), files = written.len(), "wrote feed directory");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_only_table_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stops.txt"), "stop_id\nS1\n").unwrap();
        fs::write(dir.path().join("agency.txt"), "agency_name\nMetro\n").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("routes.txt"), "route_id\n").unwrap();

        let bundle = read_bundle_dir(dir.path()).unwrap();
        let names: Vec<&str> = bundle.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["agency.txt", "stops.txt"]);
        assert_eq!(bundle["stops.txt"], "stop_id\nS1\n");
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let mut bundle = Bundle::new();
        bundle.insert("stops.txt".to_string(), "stop_id\nS1".to_string());
        bundle.insert("trips.txt".to_string(), "trip_id".to_string());

        let written = write_bundle_dir(&out, &bundle).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(read_bundle_dir(&out).unwrap(), bundle);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_bundle_dir(dir.path().join("absent")).is_err());
    }
}
