use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::data_models::Record;

pub const DEFAULT_CSV_FILENAME: &str = "crawl-results.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";

/// Flattens records into CSV text.
///
/// The header is the first record's keys in its own order; later records are
/// read against that header only, so keys they add are dropped. Cells are
/// JSON-encoded (strings quoted, numbers and booleans bare) and a missing or
/// null value becomes `""`. There is no CSV quoting beyond that.
pub fn to_csv(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(headers.join(","));

    for record in records {
        let row = headers
            .iter()
            .map(|header| cell(record.get(*header)))
            .collect::<Vec<String>>();
        rows.push(row.join(","));
    }

    rows.join("\n")
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "\"\"".to_string(),
        // Value's Display is compact JSON
        Some(value) => value.to_string(),
    }
}

/// Writes the CSV for `records` to `path`. Empty input still produces a file.
pub fn write_csv(records: &[Record], path: &Path) -> Result<()> {
    fs::write(path, to_csv(records))
        .with_context(|| format!("failed to write csv to {}", path.display()))?;
    log::info!("wrote {} row(s) to {}", records.len(), path.display());
    Ok(())
}

/// Reduces a user supplied download name to a bare `*.csv` file name.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect::<String>();
    let base = base.trim_start_matches('.');

    if base.is_empty() {
        DEFAULT_CSV_FILENAME.to_string()
    } else if base.to_ascii_lowercase().ends_with(".csv") {
        base.to_string()
    } else {
        format!("{base}.csv")
    }
}

#[test]
fn test_sanitize_filename() {
    assert_eq!(sanitize_filename("results.csv"), "results.csv");
    assert_eq!(sanitize_filename("../../etc/passwd"), "passwd.csv");
    assert_eq!(sanitize_filename("my \"report\""), "myreport.csv");
    assert_eq!(sanitize_filename(""), DEFAULT_CSV_FILENAME);
    assert_eq!(sanitize_filename("..."), DEFAULT_CSV_FILENAME);
}
