use std::borrow::Cow;

use indexmap::IndexMap;
use serde_json::Value;

use crate::aggregator::rank::non_finite_text;
use crate::aggregator::types::{GroupKey, Record};

/// Renders a cell the way it appears inside a group key.
pub fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed("null"),
        other => Cow::Owned(other.to_string()),
    }
}

/// Builds `field:value` pairs in `group_fields` order, joined by commas.
///
/// A non-finite score reads as `NaN`, `Infinity` or `-Infinity` when the
/// score field is also a group field.
pub fn group_key(record: &Record, group_fields: &[String], score_field: &str) -> GroupKey {
    let key = group_fields
        .iter()
        .map(|field| {
            let text = match non_finite_text(record.score) {
                Some(text) if field == score_field => Cow::Borrowed(text),
                _ => record.get(field).map_or(Cow::Borrowed("null"), value_text),
            };
            format!("{field}:{text}")
        })
        .collect::<Vec<_>>()
        .join(",");

    GroupKey(key)
}

/// Buckets records by group key; buckets keep first-seen key order and
/// records keep encounter order.
pub fn group_records(
    records: Vec<Record>,
    group_fields: &[String],
    score_field: &str,
) -> IndexMap<GroupKey, Vec<Record>> {
    let mut groups: IndexMap<GroupKey, Vec<Record>> = IndexMap::new();

    for record in records {
        groups
            .entry(group_key(&record, group_fields, score_field))
            .or_default()
            .push(record);
    }

    groups
}
