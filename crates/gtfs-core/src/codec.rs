//! CSV codec for feed files
//!
//! Decoding is lenient: quoted fields may hold commas, doubled quotes and
//! line breaks, a quote may follow padding after the delimiter, every
//! field is trimmed after unquoting, and data lines whose
//! width does not match the header are dropped (and remembered on the
//! table). Encoding derives the column order from the schema first, then
//! from whatever extra fields the data carries.

use crate::error::{Error, Result};
use crate::schema::TableSchema;
use crate::table::{DroppedLine, Row, Table};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::warn;

/// Parse the text of one feed file into a Table
pub fn parse_table(name: &str, text: &str) -> Result<Table> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = strip_padding_before_quotes(text);
    let mut table = Table::new(name);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv {
            file: name.to_string(),
            source: e,
        })?;

        let blank = record.iter().all(str::is_empty);

        // First non-blank record is the header
        if table.columns.is_empty() {
            if !blank {
                table.columns = record.iter().map(str::to_string).collect();
            }
            continue;
        }

        // Whitespace-only lines come back as a single empty field
        if blank && record.len() == 1 && table.columns.len() != 1 {
            continue;
        }

        if record.len() != table.columns.len() {
            let line = record.position().map_or(0, |p| p.line() as usize);
            warn!(
                file = name,
                line,
                expected = table.columns.len(),
                found = record.len(),
                "dropping line with mismatched field count"
            );
            table.dropped_lines.push(DroppedLine {
                line,
                expected: table.columns.len(),
                found: record.len(),
            });
            continue;
        }

        let row: Row = table
            .columns
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .collect();
        table.rows.push(row);
    }

    Ok(table)
}

/// Drop spaces and tabs that sit between a field boundary and an opening
/// quote, so `a, "b,c"` reads as two fields. The csv reader only treats a
/// quote as opening when it is the first byte of a field.
fn strip_padding_before_quotes(text: &str) -> Cow<'_, str> {
    if !text.contains('"') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut padding = String::new();
    let mut chars = text.chars().peekable();
    let mut in_quotes = false;
    let mut field_start = true;

    while let Some(c) = chars.next() {
        if in_quotes {
            out.push(c);
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    out.push('"');
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }

        if field_start && (c == ' ' || c == '\t') {
            padding.push(c);
            continue;
        }
        if field_start && c == '"' {
            padding.clear();
            out.push(c);
            in_quotes = true;
            field_start = false;
            continue;
        }

        out.push_str(&padding);
        padding.clear();
        out.push(c);
        field_start = matches!(c, ',' | '\n' | '\r');
    }
    out.push_str(&padding);

    Cow::Owned(out)
}

/// Output column order for a table.
///
/// Schema fields (required, then optional) come first. Any other field seen
/// in the parsed header or on any row is appended in first-seen order. With
/// no schema and no rows the parsed header is used as is.
pub fn column_order(table: &Table, schema: Option<&TableSchema>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    if let Some(schema) = schema {
        for field in schema.all_fields() {
            if seen.insert(field) {
                columns.push(field.to_string());
            }
        }
    }

    let residual = table
        .columns
        .iter()
        .map(String::as_str)
        .chain(table.rows.iter().flat_map(Row::fields));
    for field in residual {
        if seen.insert(field) {
            columns.push(field.to_string());
        }
    }

    columns
}

/// Serialize a table back to CSV text.
///
/// The header line is always emitted, even for a table with no rows. Missing
/// fields are written as empty values. Lines are joined with `\n` and there
/// is no trailing newline.
pub fn serialize_table(table: &Table, schema: Option<&TableSchema>) -> String {
    let columns = column_order(table, schema);
    let single_column = columns.len() == 1;

    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(join_record(columns.iter().map(String::as_str), single_column));

    for row in &table.rows {
        let values = columns.iter().map(|c| row.get(c).unwrap_or(""));
        lines.push(join_record(values, single_column));
    }

    lines.join("\n")
}

fn join_record<'a>(values: impl Iterator<Item = &'a str>, single_column: bool) -> String {
    let escaped: Vec<String> = values
        .map(|v| {
            // A lone empty value would read back as a blank line
            if single_column && v.is_empty() {
                "\"\"".to_string()
            } else {
                escape_csv(v)
            }
        })
        .collect();
    escaped.join(",")
}

/// Escape a value for CSV output
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    fn stops_schema() -> &'static TableSchema {
        SchemaRegistry::gtfs().schema("stops.txt").unwrap()
    }

    #[test]
    fn test_parse_simple_csv() {
        let csv = "stop_id,stop_name,stop_lat,stop_lon\nS1,Main St,40.7,-74.0\nS2,Elm St,40.8,-74.1\n";
        let table = parse_table("stops.txt", csv).unwrap();

        assert_eq!(table.name, "stops.txt");
        assert_eq!(table.columns, vec!["stop_id", "stop_name", "stop_lat", "stop_lon"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("stop_name"), Some("Main St"));
        assert_eq!(table.rows[1].get("stop_lon"), Some("-74.1"));
    }

    #[test]
    fn test_parse_quoted_fields() {
        let csv = "id,note\n1,\"He said \"\"Hi\"\", bye\"\n2,\"two\nlines\"\n";
        let table = parse_table("notes.txt", csv).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("note"), Some("He said \"Hi\", bye"));
        assert_eq!(table.rows[1].get("note"), Some("two\nlines"));
    }

    #[test]
    fn test_parse_quoted_field_after_padding() {
        let csv = "stop_id,stop_name,stop_lat,stop_lon\nS1, \"Main, North\",40.7,-74.0\nS2,\t \"Say \"\"hi\"\", ok\" ,40.8,-74.1\n";
        let table = parse_table("stops.txt", csv).unwrap();

        assert!(table.dropped_lines.is_empty());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("stop_name"), Some("Main, North"));
        assert_eq!(table.rows[0].get("stop_lat"), Some("40.7"));
        assert_eq!(table.rows[1].get("stop_name"), Some("Say \"hi\", ok"));
    }

    #[test]
    fn test_padding_inside_unquoted_values_is_kept() {
        let csv = "id,note\n1,  plain  text\n2,a \"quoted\" word\n";
        let table = parse_table("notes.txt", csv).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("note"), Some("plain  text"));
        assert_eq!(table.rows[1].get("note"), Some("a \"quoted\" word"));
    }

    #[test]
    fn test_parse_trims_fields() {
        let csv = " stop_id , stop_name \n  S1 ,\" Main St \"\n";
        let table = parse_table("stops.txt", csv).unwrap();

        assert_eq!(table.columns, vec!["stop_id", "stop_name"]);
        assert_eq!(table.rows[0].get("stop_id"), Some("S1"));
        assert_eq!(table.rows[0].get("stop_name"), Some("Main St"));
    }

    #[test]
    fn test_parse_drops_mismatched_lines() {
        let csv = "a,b,c\n1,2,3\n1,2\n1,2,3,4\n4,5,6\n";
        let table = parse_table("x.txt", csv).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].get("a"), Some("4"));
        assert_eq!(table.dropped_lines.len(), 2);
        assert_eq!(
            table.dropped_lines[0],
            DroppedLine { line: 3, expected: 3, found: 2 }
        );
        assert_eq!(table.dropped_lines[1].found, 4);
    }

    #[test]
    fn test_parse_empty_and_header_only() {
        let empty = parse_table("stops.txt", "").unwrap();
        assert!(empty.rows.is_empty());
        assert!(empty.columns.is_empty());

        let header_only = parse_table("stops.txt", "stop_id,stop_name\n").unwrap();
        assert!(header_only.rows.is_empty());
        assert_eq!(header_only.columns.len(), 2);
    }

    #[test]
    fn test_parse_skips_leading_blank_lines_bom_and_crlf() {
        let csv = "\u{feff}\n\nstop_id,stop_name\r\nS1,Main\r\n\r\n   \r\nS2,Elm\r\n";
        let table = parse_table("stops.txt", csv).unwrap();

        assert_eq!(table.columns, vec!["stop_id", "stop_name"]);
        assert_eq!(table.rows.len(), 2);
        assert!(table.dropped_lines.is_empty());
    }

    #[test]
    fn test_serialize_uses_schema_order_then_extras() {
        let csv = "stop_lon,stop_id,custom,stop_lat,stop_name\n-74.0,S1,x,40.7,Main\n";
        let table = parse_table("stops.txt", csv).unwrap();
        let out = serialize_table(&table, Some(stops_schema()));

        let mut lines = out.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("stop_id,stop_name,stop_lat,stop_lon,stop_code"));
        assert!(header.ends_with(",platform_code,custom"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("S1,Main,40.7,-74.0,,"));
        assert!(row.ends_with(",x"));
    }

    #[test]
    fn test_serialize_quotes_special_values() {
        let mut table = Table::new("notes.txt");
        table.rows.push(
            [("id", "1"), ("note", "He said \"Hi\", bye")]
                .into_iter()
                .collect(),
        );
        table.rows.push([("id", "2"), ("note", "a\nb")].into_iter().collect());

        let out = serialize_table(&table, None);
        assert_eq!(out, "id,note\n1,\"He said \"\"Hi\"\", bye\"\n2,\"a\nb\"");
    }

    #[test]
    fn test_serialize_empty_table_keeps_header() {
        let table = Table::new("stops.txt");
        let out = serialize_table(&table, Some(stops_schema()));
        assert!(out.starts_with("stop_id,stop_name,stop_lat,stop_lon"));
        assert!(!out.contains('\n'));

        assert_eq!(serialize_table(&Table::new("unknown.txt"), None), "");

        let header_only = parse_table("unknown.txt", "a,b\n").unwrap();
        assert_eq!(serialize_table(&header_only, None), "a,b");
    }

    #[test]
    fn test_single_empty_column_survives() {
        let mut table = Table::new("one.txt");
        table.rows.push([("only", "")].into_iter().collect());
        table.rows.push([("only", "v")].into_iter().collect());

        let out = serialize_table(&table, None);
        let back = parse_table("one.txt", &out).unwrap();
        assert_eq!(back.rows, table.rows);
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }
}
