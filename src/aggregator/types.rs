//! Data types used by the grouping-and-ranking pipeline.

use std::borrow::Borrow;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// One row of a tabular result set, position-correlated with the header.
pub type Row = Vec<Value>;

/// A header-led table: row 0 names the fields, rows 1..N carry values.
pub type Table = Vec<Row>;

/// Ordered, unique field names taken from row 0 of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub(crate) names: IndexSet<String>,
}

impl Header {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.names.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// A data row materialized against the header.
///
/// `fields` holds every column in header order. The score column is stored
/// there as a JSON number after coercion, and its float value is kept in
/// `score` for sorting and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) fields: IndexMap<String, Value>,
    pub(crate) score: f64,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The coerced score-field value (`NaN` when coercion failed).
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }
}

/// Composite grouping key, e.g. `sector:tech,country:US`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub(crate) String);

impl GroupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for GroupKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A [`Record`] annotated with its normalized score and position in its group.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub(crate) record: Record,
    pub(crate) normalized: f64,
    pub(crate) score: String,
    pub(crate) rank: usize,
}

impl RankedRecord {
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Unrounded normalized score.
    pub fn normalized(&self) -> f64 {
        self.normalized
    }

    /// Normalized score formatted to two decimals, as emitted under `Score`.
    pub fn score(&self) -> &str {
        &self.score
    }

    /// 1-based position within the group.
    pub fn rank(&self) -> usize {
        self.rank
    }
}

pub const SCORE_KEY: &str = "Score";
pub const RANK_KEY: &str = "Rank";

impl Serialize for RankedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self
            .record
            .fields
            .iter()
            .filter(|(name, _)| name.as_str() != SCORE_KEY && name.as_str() != RANK_KEY);

        let mut map = serializer.serialize_map(None)?;
        for (name, value) in fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(SCORE_KEY, &self.score)?;
        map.serialize_entry(RANK_KEY, &self.rank)?;
        map.end()
    }
}

/// A score-field value that could not be read as a number.
///
/// Non-fatal: the row keeps a `NaN` score and only its own group degrades.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionWarning {
    /// Index of the offending row in the table (the header is row 0).
    pub row: usize,
    pub field: String,
    pub value: Value,
}

/// Groups in first-seen order, each sorted by rank.
///
/// Serializes as a JSON object mapping group key to its ranked records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedGroups {
    pub(crate) groups: IndexMap<GroupKey, Vec<RankedRecord>>,
    pub(crate) warnings: Vec<CoercionWarning>,
}

impl RankedGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&[RankedRecord]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[RankedRecord])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn warnings(&self) -> &[CoercionWarning] {
        &self.warnings
    }

    /// All ranked records, group after group, each group in rank order.
    pub fn into_flat(self) -> Vec<RankedRecord> {
        self.groups.into_values().flatten().collect()
    }
}

impl Serialize for RankedGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.groups.serialize(serializer)
    }
}
