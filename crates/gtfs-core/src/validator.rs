//! Validation engine
//!
//! Checks are local to one row and one field; nothing here looks across rows
//! or across files. Every problem is collected, one bad row never hides the
//! next.

use crate::rules::Rule;
use crate::schema::{SchemaRegistry, TableSchema};
use crate::table::Table;
use serde::Serialize;
use std::fmt;

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// A required file is not in the feed
    MissingFile { file: String },
    /// A file the registry does not describe
    UnknownFile { file: String },
    /// A required file with a header but no rows
    EmptyFile { file: String },
    /// A required field is absent or empty (row is 1-based)
    MissingField { file: String, row: usize, field: String },
    /// A value failed one of its field rules (row is 1-based)
    InvalidValue {
        file: String,
        row: usize,
        field: String,
        value: String,
        rule: Rule,
    },
    /// A data line the CSV decoder dropped
    DroppedLine {
        file: String,
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingFile { file } => write!(f, "Missing required file: {}", file),
            Issue::UnknownFile { file } => {
                write!(f, "Unknown file: {} is not part of the GTFS specification", file)
            }
            Issue::EmptyFile { file } => write!(f, "Required file {} has no data rows", file),
            Issue::MissingField { file, row, field } => {
                write!(f, "{}: row {}: missing required field '{}'", file, row, field)
            }
            Issue::InvalidValue {
                file,
                row,
                field,
                value,
                rule,
            } => write!(
                f,
                "{}: row {}: invalid value '{}' for field '{}' (expected {})",
                file, row, value, field, rule
            ),
            Issue::DroppedLine {
                file,
                line,
                expected,
                found,
            } => write!(
                f,
                "{}: line {} skipped: expected {} fields, found {}",
                file, line, expected, found
            ),
        }
    }
}

/// Errors and warnings from a validation run, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there are no errors (warnings are allowed)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable error lines
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(Issue::to_string).collect()
    }

    /// Human-readable warning lines
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(Issue::to_string).collect()
    }

    /// Append another report's findings
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validate a whole feed: required files first, then every loaded table
pub fn validate_feed<'a>(
    registry: &SchemaRegistry,
    tables: impl IntoIterator<Item = &'a Table>,
) -> ValidationReport {
    let tables: Vec<&Table> = tables.into_iter().collect();
    let mut report = ValidationReport::new();

    for required in registry.required_files() {
        if !tables.iter().any(|t| t.name == *required) {
            report.errors.push(Issue::MissingFile {
                file: required.to_string(),
            });
        }
    }

    for table in tables {
        let schema = registry.schema(&table.name);
        report.merge(validate_file(registry, table, schema));
    }

    report
}

/// Validate one table against its schema; `None` marks an unknown file
pub fn validate_file(
    registry: &SchemaRegistry,
    table: &Table,
    schema: Option<&TableSchema>,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let file = table.name.as_str();

    let Some(schema) = schema else {
        report.warnings.push(Issue::UnknownFile {
            file: file.to_string(),
        });
        return report;
    };

    for dropped in &table.dropped_lines {
        report.warnings.push(Issue::DroppedLine {
            file: file.to_string(),
            line: dropped.line,
            expected: dropped.expected,
            found: dropped.found,
        });
    }

    if table.rows.is_empty() {
        if registry.is_required_file(file) {
            report.errors.push(Issue::EmptyFile {
                file: file.to_string(),
            });
        }
        return report;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let row_number = index + 1;

        for field in schema.required_fields {
            // Whitespace-only counts as missing, same as the required rule
            if !row.get(field).is_some_and(|v| Rule::Required.check(v)) {
                report.errors.push(Issue::MissingField {
                    file: file.to_string(),
                    row: row_number,
                    field: field.to_string(),
                });
            }
        }

        for (field, value) in row.iter() {
            if value.trim().is_empty() {
                continue;
            }
            for rule in registry.rules_for(field) {
                if *rule == Rule::Required || rule.check(value) {
                    continue;
                }
                report.errors.push(Issue::InvalidValue {
                    file: file.to_string(),
                    row: row_number,
                    field: field.to_string(),
                    value: value.to_string(),
                    rule: *rule,
                });
            }
        }
    }

    report
}
