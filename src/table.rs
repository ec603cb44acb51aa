//! Loading header-led tables from local files.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

use crate::aggregator::types::{Row, Table};

/// Loads a table from `.csv` or `.json`, chosen by file extension.
pub fn load_table(path: &str) -> Result<Table> {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("csv") => load_csv(path),
        Some("json") => load_json(path),
        _ => bail!("unsupported table file '{path}': expected a .csv or .json extension"),
    }
}

/// Reads a CSV file whose first record is the header. Every cell is kept as
/// a JSON string; rows of differing width are passed through untouched.
pub fn load_csv(path: &str) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("failed to open '{path}'"))?;
    let table = read_csv(file).with_context(|| format!("failed to read CSV '{path}'"))?;
    debug!(path, rows = table.len(), "CSV table loaded");
    Ok(table)
}

/// Reads a JSON array of arrays, header first.
pub fn load_json(path: &str) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("failed to open '{path}'"))?;
    let table: Table = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("'{path}' is not a JSON array of arrays"))?;
    debug!(path, rows = table.len(), "JSON table loaded");
    Ok(table)
}

pub fn read_csv<R: std::io::Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Row = record
            .iter()
            .map(|cell| Value::String(cell.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_csv_keeps_header_and_short_rows() {
        let data = "ticker,sector,score\nA,tech,10\nB,tech\n";
        let table = read_csv(data.as_bytes()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table[0], vec![json!("ticker"), json!("sector"), json!("score")]);
        assert_eq!(table[2], vec![json!("B"), json!("tech")]);
    }

    #[test]
    fn test_load_table_rejects_unknown_extension() {
        let err = load_table("table.parquet").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }
}
