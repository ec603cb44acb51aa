use indexmap::{IndexMap, IndexSet};
use serde_json::{Number, Value};
use tracing::warn;

use crate::aggregator::types::{CoercionWarning, Header, Record, Row};
use crate::error::{AggregateError, FieldRole};

/// Integral floats below this magnitude are emitted as JSON integers.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Validates row 0 of a table and turns it into a [`Header`].
pub fn parse_header(row: &Row) -> Result<Header, AggregateError> {
    let mut names = IndexSet::with_capacity(row.len());

    for (column, cell) in row.iter().enumerate() {
        let name = cell.as_str().ok_or(AggregateError::InvalidHeader { column })?;
        if !names.insert(name.to_string()) {
            return Err(AggregateError::DuplicateField(name.to_string()));
        }
    }

    Ok(Header { names })
}

/// Checks that the score field and every group field name a header column.
pub fn require_fields(
    header: &Header,
    score_field: &str,
    group_fields: &[String],
) -> Result<(), AggregateError> {
    if !header.contains(score_field) {
        return Err(AggregateError::MissingField {
            field: score_field.to_string(),
            role: FieldRole::Score,
        });
    }

    if let Some(missing) = group_fields.iter().find(|f| !header.contains(f)) {
        return Err(AggregateError::MissingField {
            field: missing.clone(),
            role: FieldRole::Group,
        });
    }

    Ok(())
}

/// Zips every data row against the header, coercing the score column.
///
/// Rows are validated before any record is built, so a malformed table never
/// yields partial output. Non-numeric score values are reported as warnings.
pub fn materialize(
    header: &Header,
    rows: &[Row],
    score_field: &str,
) -> Result<(Vec<Record>, Vec<CoercionWarning>), AggregateError> {
    if let Some((i, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != header.len())
    {
        return Err(AggregateError::MalformedTable {
            row: i + 1,
            expected: header.len(),
            found: row.len(),
        });
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut warnings = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let mut fields: IndexMap<String, Value> = header
            .iter()
            .map(str::to_string)
            .zip(row.iter().cloned())
            .collect();

        let raw = fields.get(score_field).cloned().unwrap_or(Value::Null);
        let score = coerce_number(&raw).unwrap_or_else(|| {
            warn!(row = i + 1, field = score_field, value = %raw, "Score value is not numeric");
            warnings.push(CoercionWarning {
                row: i + 1,
                field: score_field.to_string(),
                value: raw.clone(),
            });
            f64::NAN
        });

        fields.insert(score_field.to_string(), number_value(score));
        records.push(Record { fields, score });
    }

    Ok((records, warnings))
}

/// Reads a cell as a float: JSON numbers directly, strings after trimming.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

/// Parses decimal text. The only non-finite spellings accepted are
/// `Infinity` with an optional sign and literals too large for `f64`;
/// `inf`, `nan` and friends are rejected.
fn parse_decimal(s: &str) -> Option<f64> {
    let unsigned = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    if unsigned == "Infinity" {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Converts a coerced score back into a JSON value.
///
/// Integral values become integers (`30`, not `30.0`); `NaN` and infinities,
/// which JSON cannot carry, become `null`.
pub fn number_value(v: f64) -> Value {
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
        return Value::from(v as i64);
    }
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}
