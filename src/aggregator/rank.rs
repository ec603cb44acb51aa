use std::cmp::Ordering;

use crate::aggregator::ZeroTotalPolicy;
use crate::aggregator::types::{RankedRecord, Record};

/// Largest float below which every integer is exactly representable.
const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

/// Descending order on score; `NaN` sorts after every number.
///
/// Equal scores compare `Equal` so a stable sort keeps encounter order.
pub fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Sum of the group's scores. A single `NaN` makes the total `NaN`.
pub fn total(records: &[Record]) -> f64 {
    records.iter().map(Record::score).sum()
}

/// Spelling of a non-finite number, as used in scores and group keys.
pub fn non_finite_text(v: f64) -> Option<&'static str> {
    if v.is_nan() {
        Some("NaN")
    } else if v == f64::INFINITY {
        Some("Infinity")
    } else if v == f64::NEG_INFINITY {
        Some("-Infinity")
    } else {
        None
    }
}

/// Formats a normalized score to two decimals.
///
/// Exact halves round away from zero (`0.125` gives `0.13`) and negative
/// zero prints without a sign. Non-finite values use the spellings `NaN`,
/// `Infinity` and `-Infinity`.
pub fn format_score(v: f64) -> String {
    if let Some(text) = non_finite_text(v) {
        return text.to_string();
    }

    let sign = if v < 0.0 { "-" } else { "" };
    let magnitude = v.abs();

    // A binary value lies exactly between two hundredths only when it is an
    // odd number of eighths.
    let eighths = magnitude * 8.0;
    if eighths.fract() == 0.0 && eighths < MAX_EXACT && eighths % 2.0 == 1.0 {
        let hundredths = (eighths as u64 * 25 + 1) / 2;
        return format!("{sign}{}.{:02}", hundredths / 100, hundredths % 100);
    }

    format!("{sign}{magnitude:.2}")
}

/// Sorts one group and annotates each record with its `Score` and `Rank`.
///
/// `Score = value / total * size`, so scores sum to the group size whenever
/// the total is nonzero. `Rank` is the 1-based sorted position; ties are not
/// collapsed.
pub fn rank_group(mut records: Vec<Record>, zero_total: ZeroTotalPolicy) -> Vec<RankedRecord> {
    records.sort_by(|a, b| descending(a.score, b.score));

    let sum = total(&records);
    let size = records.len() as f64;

    records
        .into_iter()
        .enumerate()
        .map(|(j, record)| {
            let normalized = if sum == 0.0 && zero_total == ZeroTotalPolicy::Zero {
                0.0
            } else {
                record.score / sum * size
            };

            RankedRecord {
                score: format_score(normalized),
                normalized,
                rank: j + 1,
                record,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn record(score: f64) -> Record {
        Record {
            fields: IndexMap::new(),
            score,
        }
    }

    fn scores(records: &[RankedRecord]) -> Vec<&str> {
        records.iter().map(RankedRecord::score).collect()
    }

    #[test]
    fn test_format_score_boundaries() {
        assert_eq!(format_score(1.5), "1.50");
        assert_eq!(format_score(2.0 / 3.0), "0.67");
        assert_eq!(format_score(0.0), "0.00");
        assert_eq!(format_score(12.0), "12.00");
        assert_eq!(format_score(f64::NAN), "NaN");
        assert_eq!(format_score(f64::INFINITY), "Infinity");
        assert_eq!(format_score(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_score_rounds_halves_away_from_zero() {
        assert_eq!(format_score(0.125), "0.13");
        assert_eq!(format_score(0.625), "0.63");
        assert_eq!(format_score(0.375), "0.38");
        assert_eq!(format_score(1.875), "1.88");
        assert_eq!(format_score(-0.125), "-0.13");
        assert_eq!(format_score(0.124), "0.12");
    }

    #[test]
    fn test_format_score_drops_sign_of_negative_zero() {
        assert_eq!(format_score(-0.0), "0.00");
        assert_eq!(format_score(-1.5), "-1.50");
    }

    #[test]
    fn test_rank_group_half_hundredth_scores() {
        let ranked = rank_group(vec![record(15.0), record(1.0)], ZeroTotalPolicy::Propagate);
        assert_eq!(scores(&ranked), vec!["1.88", "0.13"]);
    }

    #[test]
    fn test_descending_puts_nan_last() {
        let mut values = vec![1.0, f64::NAN, 3.0, 2.0];
        values.sort_by(|a, b| descending(*a, *b));
        assert_eq!(&values[..3], &[3.0, 2.0, 1.0]);
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_rank_group_normalizes_to_group_size() {
        let ranked = rank_group(
            vec![record(10.0), record(30.0), record(20.0)],
            ZeroTotalPolicy::Propagate,
        );

        assert_eq!(scores(&ranked), vec!["1.50", "1.00", "0.50"]);
        let ranks: Vec<_> = ranked.iter().map(RankedRecord::rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        let sum: f64 = ranked.iter().map(RankedRecord::normalized).sum();
        assert!((sum - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_group_zero_total_propagates_nan() {
        let ranked = rank_group(vec![record(0.0), record(0.0)], ZeroTotalPolicy::Propagate);
        assert_eq!(scores(&ranked), vec!["NaN", "NaN"]);
    }

    #[test]
    fn test_rank_group_zero_total_zero_policy() {
        let ranked = rank_group(vec![record(0.0), record(0.0)], ZeroTotalPolicy::Zero);
        assert_eq!(scores(&ranked), vec!["0.00", "0.00"]);
        let ranks: Vec<_> = ranked.iter().map(RankedRecord::rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn test_rank_group_nan_member_poisons_group() {
        let ranked = rank_group(
            vec![record(f64::NAN), record(5.0)],
            ZeroTotalPolicy::Propagate,
        );
        assert_eq!(ranked[0].record().score(), 5.0);
        assert_eq!(scores(&ranked), vec!["NaN", "NaN"]);
        assert_eq!(ranked[1].rank(), 2);
    }
}
