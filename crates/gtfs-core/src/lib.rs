//! gtfs-core: Core library for loading, validating and editing GTFS feeds
//!
//! This library provides functionality to:
//! - Parse and serialize the CSV dialect used by feed files
//! - Describe every GTFS static file with a declarative schema registry
//! - Validate tables against field and file level rules
//! - Hold a feed in memory and edit it row by row
//! - Read and write unpacked feed directories and JSON edit scripts

pub mod bundle;
pub mod codec;
pub mod error;
pub mod feed;
pub mod patch;
pub mod rules;
pub mod schema;
pub mod table;
pub mod validator;

pub use bundle::{read_bundle_dir, write_bundle_dir};
pub use codec::{column_order, parse_table, serialize_table};
pub use error::{Error, Result};
pub use feed::{Bundle, FeedStore};
pub use patch::{apply_patch, BatchFile, Edit, PatchFile, PatchResult};
pub use rules::Rule;
pub use schema::{SchemaRegistry, TableSchema, TABLE_SUFFIX};
pub use table::{DroppedLine, Row, Table};
pub use validator::{validate_feed, validate_file, Issue, ValidationReport};
