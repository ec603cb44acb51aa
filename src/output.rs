//! Rendering and persistence of ranked groups.
//!
//! Supports JSON on stdout, a JSON report file, and a flat CSV file.

use anyhow::Result;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::aggregator::group::value_text;
use crate::aggregator::types::{RANK_KEY, RankedGroups, RankedRecord, SCORE_KEY};

/// Response body shape: keyed by group, or one list in group order.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RankedOutput {
    Grouped(RankedGroups),
    Flat(Vec<RankedRecord>),
}

impl RankedOutput {
    pub fn new(groups: RankedGroups, flat: bool) -> Self {
        if flat {
            RankedOutput::Flat(groups.into_flat())
        } else {
            RankedOutput::Grouped(groups)
        }
    }
}

/// JSON file envelope around a ranking result.
#[derive(Debug, Serialize)]
pub struct RankedReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub score_field: &'a str,
    pub group_fields: &'a [String],
    pub result: &'a RankedOutput,
}

/// Prints the result as pretty JSON on stdout.
pub fn print_json(output: &RankedOutput) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

/// Writes the result wrapped in a [`RankedReport`] to `path`.
pub fn write_json(
    path: &str,
    score_field: &str,
    group_fields: &[String],
    output: &RankedOutput,
) -> Result<()> {
    let report = RankedReport {
        generated_at: Utc::now(),
        score_field,
        group_fields,
        result: output,
    };

    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &report)?;
    info!(path, "JSON report written");
    Ok(())
}

/// Name of the leading group-key column: `group`, or `_group`, `__group` and
/// so on when a record field already uses that name.
fn group_column(columns: &IndexSet<&str>) -> String {
    let mut name = String::from("group");
    while columns.contains(name.as_str()) {
        name.insert(0, '_');
    }
    name
}

/// Writes every ranked record as one CSV row, prefixed by its group key.
///
/// Columns are the union of record fields in first-seen order, then `Score`
/// and `Rank`. Missing and null cells are left empty.
pub fn write_csv(path: &str, groups: &RankedGroups) -> Result<()> {
    let mut columns: IndexSet<&str> = IndexSet::new();
    for (_, records) in groups.iter() {
        for rec in records {
            for name in rec.record().fields().keys() {
                if name != SCORE_KEY && name != RANK_KEY {
                    columns.insert(name.as_str());
                }
            }
        }
    }
    debug!(path, columns = columns.len(), "Writing ranked CSV");

    let mut writer = csv::Writer::from_path(path)?;

    let group = group_column(&columns);
    let mut header = vec![group.as_str()];
    header.extend(columns.iter().copied());
    header.extend([SCORE_KEY, RANK_KEY]);
    writer.write_record(&header)?;

    for (key, records) in groups.iter() {
        for rec in records {
            let mut row = vec![key.to_string()];
            for column in &columns {
                let cell = match rec.record().get(column) {
                    None | Some(Value::Null) => String::new(),
                    Some(v) => value_text(v).into_owned(),
                };
                row.push(cell);
            }
            row.push(rec.score().to_string());
            row.push(rec.rank().to_string());
            writer.write_record(&row)?;
        }
    }

    writer.flush()?;
    info!(path, groups = groups.len(), "CSV written");
    Ok(())
}
