//! C FFI bindings for gtfs-core
//!
//! This crate provides a C-compatible API for UI hosts (map editors, Qt or
//! web shells) that only need the narrow row-level interface: load a file,
//! read and write cells, add and delete rows, export and validate.

use gtfs_core::{FeedStore, Row, SchemaRegistry};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Opaque handle to an in-memory feed
pub struct GtfsFeed {
    inner: FeedStore<'static>,
}

unsafe fn to_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        None
    } else {
        CStr::from_ptr(s).to_str().ok()
    }
}

fn into_c_string(s: &str) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Create a new feed holding the required and authoring files, all empty
#[no_mangle]
pub extern "C" fn gtfs_feed_new_empty() -> *mut GtfsFeed {
    let inner = FeedStore::create_empty(SchemaRegistry::gtfs());
    Box::into_raw(Box::new(GtfsFeed { inner }))
}

/// Decode one file's text into the feed, replacing any existing table
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - `name` and `text` must be valid C strings
/// - Returns false on decode failure or invalid arguments
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_load_file(
    feed: *mut GtfsFeed,
    name: *const c_char,
    text: *const c_char,
) -> bool {
    if feed.is_null() {
        return false;
    }
    let (Some(name), Some(text)) = (to_str(name), to_str(text)) else {
        return false;
    };
    (*feed).inner.load_file(name, text).is_ok()
}

/// Free a feed
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty` or null
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_free(feed: *mut GtfsFeed) {
    if !feed.is_null() {
        drop(Box::from_raw(feed));
    }
}

/// Number of rows in a file, or -1 if the file is not in the feed
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - `name` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_row_count(feed: *const GtfsFeed, name: *const c_char) -> isize {
    if feed.is_null() {
        return -1;
    }
    to_str(name)
        .and_then(|name| (*feed).inner.get_file_data(name))
        .map_or(-1, |rows| rows.len() as isize)
}

/// Get a cell value
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - `name` and `field` must be valid C strings
/// - Returns null if the file, row or field does not exist
/// - Caller must free the returned string with `gtfs_free_string`
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_get_cell(
    feed: *const GtfsFeed,
    name: *const c_char,
    row: usize,
    field: *const c_char,
) -> *mut c_char {
    if feed.is_null() {
        return ptr::null_mut();
    }
    let (Some(name), Some(field)) = (to_str(name), to_str(field)) else {
        return ptr::null_mut();
    };

    (*feed)
        .inner
        .get_row(name, row)
        .and_then(|r| r.get(field))
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Set a cell value, creating the field on the row if needed
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - `name`, `field` and `value` must be valid C strings
/// - Returns false if the file or row does not exist
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_set_cell(
    feed: *mut GtfsFeed,
    name: *const c_char,
    row: usize,
    field: *const c_char,
    value: *const c_char,
) -> bool {
    if feed.is_null() {
        return false;
    }
    match (to_str(name), to_str(field), to_str(value)) {
        (Some(name), Some(field), Some(value)) => (*feed).inner.update_cell(name, row, field, value),
        _ => false,
    }
}

/// Append a row with every schema field empty; returns its index or -1
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - `name` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_add_row(feed: *mut GtfsFeed, name: *const c_char) -> isize {
    if feed.is_null() {
        return -1;
    }
    let Some(name) = to_str(name) else {
        return -1;
    };

    let store = &mut (*feed).inner;
    store.add_row(name, &Row::new());
    store
        .get_file_data(name)
        .map_or(-1, |rows| rows.len() as isize - 1)
}

/// Delete a row; later rows shift down by one
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - `name` must be a valid C string
/// - Returns false if the file or row does not exist
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_delete_row(
    feed: *mut GtfsFeed,
    name: *const c_char,
    row: usize,
) -> bool {
    if feed.is_null() {
        return false;
    }
    to_str(name).is_some_and(|name| (*feed).inner.delete_row(name, row))
}

/// Serialize one file to CSV text
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - `name` must be a valid C string
/// - Returns null if the file is not in the feed
/// - Caller must free the returned string with `gtfs_free_string`
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_export_file(
    feed: *const GtfsFeed,
    name: *const c_char,
) -> *mut c_char {
    if feed.is_null() {
        return ptr::null_mut();
    }
    to_str(name)
        .and_then(|name| (*feed).inner.export_file(name).ok())
        .map(|text| into_c_string(&text))
        .unwrap_or(ptr::null_mut())
}

/// Validate the feed and return the report as JSON
///
/// # Safety
/// - `feed` must be a valid pointer returned by `gtfs_feed_new_empty`
/// - Caller must free the returned string with `gtfs_free_string`
#[no_mangle]
pub unsafe extern "C" fn gtfs_feed_validate_json(feed: *const GtfsFeed) -> *mut c_char {
    if feed.is_null() {
        return ptr::null_mut();
    }
    let report = (*feed).inner.validate();
    serde_json::to_string(&report)
        .map(|json| into_c_string(&json))
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a gtfs_* function or null
#[no_mangle]
pub unsafe extern "C" fn gtfs_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take_string(s: *mut c_char) -> Option<String> {
        if s.is_null() {
            return None;
        }
        let owned = CStr::from_ptr(s).to_string_lossy().into_owned();
        gtfs_free_string(s);
        Some(owned)
    }

    #[test]
    fn test_row_lifecycle() {
        unsafe {
            let feed = gtfs_feed_new_empty();
            let stops = c("stops.txt");

            assert_eq!(gtfs_feed_row_count(feed, stops.as_ptr()), 0);
            assert_eq!(gtfs_feed_add_row(feed, stops.as_ptr()), 0);
            assert!(gtfs_feed_set_cell(
                feed,
                stops.as_ptr(),
                0,
                c("stop_id").as_ptr(),
                c("S1").as_ptr()
            ));
            assert!(!gtfs_feed_set_cell(
                feed,
                stops.as_ptr(),
                3,
                c("stop_id").as_ptr(),
                c("S9").as_ptr()
            ));

            let value = take_string(gtfs_feed_get_cell(feed, stops.as_ptr(), 0, c("stop_id").as_ptr()));
            assert_eq!(value.as_deref(), Some("S1"));
            let empty = take_string(gtfs_feed_get_cell(feed, stops.as_ptr(), 0, c("stop_code").as_ptr()));
            assert_eq!(empty.as_deref(), Some(""));

            assert!(gtfs_feed_delete_row(feed, stops.as_ptr(), 0));
            assert!(!gtfs_feed_delete_row(feed, stops.as_ptr(), 0));
            assert_eq!(gtfs_feed_row_count(feed, c("missing.txt").as_ptr()), -1);

            gtfs_feed_free(feed);
        }
    }

    #[test]
    fn test_load_export_validate() {
        unsafe {
            let feed = gtfs_feed_new_empty();
            let stops = c("stops.txt");
            let text = c("stop_id,stop_name,stop_lat,stop_lon\nS1,\"Main, North\",40.7,-74.0\n");

            assert!(gtfs_feed_load_file(feed, stops.as_ptr(), text.as_ptr()));
            assert_eq!(gtfs_feed_row_count(feed, stops.as_ptr()), 1);

            let exported = take_string(gtfs_feed_export_file(feed, stops.as_ptr())).unwrap();
            assert!(exported.contains("\"Main, North\""));

            let json = take_string(gtfs_feed_validate_json(feed)).unwrap();
            let report: serde_json::Value = serde_json::from_str(&json).unwrap();
            let errors = report["errors"].as_array().unwrap();
            assert!(errors.iter().any(|e| e["file"] == "agency.txt"));
            assert!(!errors.iter().any(|e| e["file"] == "stops.txt"));

            gtfs_feed_free(feed);
        }
    }

    #[test]
    fn test_null_handles() {
        unsafe {
            assert_eq!(gtfs_feed_row_count(ptr::null(), ptr::null()), -1);
            assert!(gtfs_feed_get_cell(ptr::null(), ptr::null(), 0, ptr::null()).is_null());
            assert!(!gtfs_feed_load_file(ptr::null_mut(), ptr::null(), ptr::null()));
            gtfs_feed_free(ptr::null_mut());
            gtfs_free_string(ptr::null_mut());
        }
    }
}
