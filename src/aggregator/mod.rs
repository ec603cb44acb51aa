//! Grouping and ranking of header-led tables.
//!
//! Rows are zipped against the header into records, bucketed by a composite
//! group key, sorted by a numeric score field within each bucket and
//! annotated with a normalized `Score` and a positional `Rank`.

pub mod group;
pub mod materialize;
pub mod rank;
pub mod types;

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::AggregateError;
use group::group_records;
use materialize::{materialize, parse_header, require_fields};
use rank::rank_group;
use types::{RankedGroups, Row};

/// What to emit for members of a group whose score total is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroTotalPolicy {
    /// Divide by zero anyway; members get `NaN` (or infinite) scores.
    #[default]
    Propagate,
    /// Every member scores `0.00`.
    Zero,
}

impl FromStr for ZeroTotalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "propagate" => Ok(ZeroTotalPolicy::Propagate),
            "zero" => Ok(ZeroTotalPolicy::Zero),
            other => Err(format!(
                "unknown zero-total policy '{other}' (expected 'propagate' or 'zero')"
            )),
        }
    }
}

impl fmt::Display for ZeroTotalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroTotalPolicy::Propagate => f.write_str("propagate"),
            ZeroTotalPolicy::Zero => f.write_str("zero"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub zero_total: ZeroTotalPolicy,
}

/// Groups `table` by `group_fields` and ranks each group by `score_field`.
///
/// Row 0 of `table` is the header. See [`aggregate_with`] for the options
/// this uses by default.
///
/// # Errors
///
/// Returns an [`AggregateError`] if the table has no header, a data row does
/// not match the header width, or a named field is absent from the header.
pub fn aggregate(
    table: &[Row],
    score_field: &str,
    group_fields: &[String],
) -> Result<RankedGroups, AggregateError> {
    aggregate_with(table, score_field, group_fields, &AggregateOptions::default())
}

/// [`aggregate`] with explicit [`AggregateOptions`].
#[tracing::instrument(skip(table, options), fields(rows = table.len().saturating_sub(1)))]
pub fn aggregate_with(
    table: &[Row],
    score_field: &str,
    group_fields: &[String],
    options: &AggregateOptions,
) -> Result<RankedGroups, AggregateError> {
    let (header_row, rows) = table.split_first().ok_or(AggregateError::EmptyTable)?;
    if group_fields.is_empty() {
        return Err(AggregateError::NoGroupFields);
    }

    let header = parse_header(header_row)?;
    require_fields(&header, score_field, group_fields)?;

    let (records, warnings) = materialize(&header, rows, score_field)?;

    let groups = group_records(records, group_fields, score_field)
        .into_iter()
        .map(|(key, members)| {
            let ranked = rank_group(members, options.zero_total);
            debug!(group = %key, members = ranked.len(), "Group ranked");
            (key, ranked)
        })
        .collect();

    Ok(RankedGroups { groups, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn table(rows: &[&[&str]]) -> Vec<Row> {
        rows.iter()
            .map(|r| r.iter().map(|c| json!(c)).collect())
            .collect()
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn sector_table() -> Vec<Row> {
        table(&[
            &["ticker", "sector", "score"],
            &["A", "tech", "10"],
            &["B", "tech", "30"],
            &["C", "finance", "5"],
        ])
    }

    #[test]
    fn test_aggregate_sector_example() {
        let groups = aggregate(&sector_table(), "score", &fields(&["sector"])).unwrap();

        let keys: Vec<_> = groups.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["sector:tech", "sector:finance"]);

        let value = serde_json::to_value(&groups).unwrap();
        assert_eq!(
            value,
            json!({
                "sector:tech": [
                    {"ticker": "B", "sector": "tech", "score": 30, "Score": "1.50", "Rank": 1},
                    {"ticker": "A", "sector": "tech", "score": 10, "Score": "0.50", "Rank": 2}
                ],
                "sector:finance": [
                    {"ticker": "C", "sector": "finance", "score": 5, "Score": "1.00", "Rank": 1}
                ]
            })
        );
    }

    #[test]
    fn test_aggregate_header_only_yields_no_groups() {
        let groups = aggregate(
            &table(&[&["ticker", "sector", "score"]]),
            "score",
            &fields(&["sector"]),
        )
        .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_aggregate_structural_errors() {
        assert_eq!(
            aggregate(&[], "score", &fields(&["sector"])),
            Err(AggregateError::EmptyTable)
        );
        assert_eq!(
            aggregate(&sector_table(), "score", &[]),
            Err(AggregateError::NoGroupFields)
        );
        assert!(matches!(
            aggregate(&sector_table(), "weight", &fields(&["sector"])),
            Err(AggregateError::MissingField { .. })
        ));
    }

    #[test]
    fn test_aggregate_malformed_row_yields_no_mapping() {
        let mut t = sector_table();
        t.push(vec![json!("D"), json!("tech")]);

        assert_eq!(
            aggregate(&t, "score", &fields(&["sector"])),
            Err(AggregateError::MalformedTable {
                row: 4,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_aggregate_bad_value_degrades_only_its_group() {
        let t = table(&[
            &["ticker", "sector", "score"],
            &["A", "tech", "10"],
            &["B", "tech", "oops"],
            &["C", "finance", "5"],
        ]);

        let groups = aggregate(&t, "score", &fields(&["sector"])).unwrap();

        assert_eq!(groups.warnings().len(), 1);
        assert_eq!(groups.warnings()[0].row, 2);
        for rec in groups.get("sector:tech").unwrap() {
            assert_eq!(rec.score(), "NaN");
        }
        assert_eq!(groups.get("sector:finance").unwrap()[0].score(), "1.00");
    }

    #[test]
    fn test_aggregate_zero_total_policies() {
        let t = table(&[
            &["ticker", "sector", "score"],
            &["A", "tech", "0"],
            &["B", "tech", "0"],
        ]);

        let nan = aggregate(&t, "score", &fields(&["sector"])).unwrap();
        assert!(nan.get("sector:tech").unwrap().iter().all(|r| r.score() == "NaN"));

        let options = AggregateOptions {
            zero_total: ZeroTotalPolicy::Zero,
        };
        let zero = aggregate_with(&t, "score", &fields(&["sector"]), &options).unwrap();
        assert!(zero.get("sector:tech").unwrap().iter().all(|r| r.score() == "0.00"));
    }

    #[test]
    fn test_aggregate_groups_on_coerced_score() {
        let t = table(&[&["ticker", "score"], &["A", "10.0"], &["B", "10"]]);

        let groups = aggregate(&t, "score", &fields(&["score"])).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("score:10").unwrap().len(), 2);
    }

    #[test]
    fn test_aggregate_groups_non_numeric_scores_under_nan() {
        let t = table(&[
            &["ticker", "score"],
            &["A", "n/a"],
            &["B", "Infinity"],
            &["C", ""],
        ]);

        let groups = aggregate(&t, "score", &fields(&["score"])).unwrap();
        let keys: Vec<_> = groups.keys().map(|k| k.as_str()).collect();

        assert_eq!(keys, vec!["score:NaN", "score:Infinity"]);
        assert_eq!(groups.get("score:NaN").unwrap().len(), 2);
        assert_eq!(groups.warnings().len(), 2);
    }

    #[test]
    fn test_aggregate_accepts_json_numbers() {
        let t: Vec<Row> = vec![
            vec![json!("ticker"), json!("year"), json!("score")],
            vec![json!("A"), json!(2021), json!(1.5)],
            vec![json!("B"), json!(2021), Value::Null],
        ];

        let groups = aggregate(&t, "score", &fields(&["year"])).unwrap();
        let members = groups.get("year:2021").unwrap();

        assert_eq!(members[0].record().get("ticker"), Some(&json!("A")));
        assert_eq!(members[1].record().get("score"), Some(&Value::Null));
    }

    #[test]
    fn test_zero_total_policy_parse() {
        assert_eq!("zero".parse(), Ok(ZeroTotalPolicy::Zero));
        assert_eq!("propagate".parse(), Ok(ZeroTotalPolicy::Propagate));
        assert!("other".parse::<ZeroTotalPolicy>().is_err());
    }
}
