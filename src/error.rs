//! Structural failures of the grouping-and-ranking transform.

use std::fmt;

use thiserror::Error;

/// Which parameter referenced a field that the header does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Score,
    Group,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::Score => f.write_str("score"),
            FieldRole::Group => f.write_str("group"),
        }
    }
}

/// Error type for inputs the aggregator refuses to process.
///
/// Every variant aborts the whole call; no partial mapping is returned.
/// Per-row numeric problems are not errors, see
/// [`CoercionWarning`](crate::aggregator::types::CoercionWarning).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("table is empty: a header row is required")]
    EmptyTable,
    #[error("at least one group field is required")]
    NoGroupFields,
    #[error("malformed table: row {row} has {found} values, header has {expected}")]
    MalformedTable {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("malformed table: header cell {column} is not a field name")]
    InvalidHeader { column: usize },
    #[error("malformed table: field '{0}' appears more than once in the header")]
    DuplicateField(String),
    #[error("{role} field '{field}' is not present in the header")]
    MissingField { field: String, role: FieldRole },
}
