//! Deterministic ordering and truncation of screen matches.
//!
//! Rows are ordered by `rs` in the screen's polarity with null `rs` after
//! every non-null value, whichever the polarity. Equal `rs` values fall back
//! to symbol ascending, then interval ascending, so repeated calls return the
//! same sequence.

use std::cmp::Ordering;

use super::criteria::SortPolarity;
use crate::models::MatchedBar;

/// Compare two relative-strength scores, nulls last.
pub fn compare_rs(a: Option<f64>, b: Option<f64>, polarity: SortPolarity) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match polarity {
            SortPolarity::Ascending => a.total_cmp(&b),
            SortPolarity::Descending => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Full row ordering: `rs` per polarity, then symbol and interval ascending.
pub fn compare(a: &MatchedBar, b: &MatchedBar, polarity: SortPolarity) -> Ordering {
    compare_rs(a.rs, b.rs, polarity)
        .then_with(|| a.symbol.cmp(&b.symbol))
        .then_with(|| a.interval.cmp(&b.interval))
}

/// Sort rows and keep at most `limit` from the head.
pub fn rank(mut rows: Vec<MatchedBar>, polarity: SortPolarity, limit: Option<usize>) -> Vec<MatchedBar> {
    rows.sort_by(|a, b| compare(a, b, polarity));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

/// Whether `rows` is already in ranked order.
pub fn is_ranked(rows: &[MatchedBar], polarity: SortPolarity) -> bool {
    rows.windows(2)
        .all(|pair| compare(&pair[0], &pair[1], polarity) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(symbol: &str, rs: Option<f64>) -> MatchedBar {
        MatchedBar {
            symbol: symbol.to_string(),
            instrument_type: "stock".to_string(),
            interval: "1day".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            close: 10.0,
            rs,
            prev_close: None,
        }
    }

    fn symbols(rows: &[MatchedBar]) -> Vec<&str> {
        rows.iter().map(|r| r.symbol.as_str()).collect()
    }

    fn sample() -> Vec<MatchedBar> {
        vec![
            row("NUL1", None),
            row("MID", Some(50.0)),
            row("LOW", Some(10.0)),
            row("NUL0", None),
            row("HIGH", Some(90.0)),
        ]
    }

    #[test]
    fn test_descending_nulls_last() {
        let ranked = rank(sample(), SortPolarity::Descending, None);
        assert_eq!(symbols(&ranked), vec!["HIGH", "MID", "LOW", "NUL0", "NUL1"]);
        assert!(is_ranked(&ranked, SortPolarity::Descending));
    }

    #[test]
    fn test_ascending_nulls_last() {
        let ranked = rank(sample(), SortPolarity::Ascending, None);
        assert_eq!(symbols(&ranked), vec!["LOW", "MID", "HIGH", "NUL0", "NUL1"]);
        assert!(is_ranked(&ranked, SortPolarity::Ascending));
    }

    #[test]
    fn test_ties_break_on_symbol() {
        let rows = vec![row("ZZZ", Some(70.0)), row("AAA", Some(70.0)), row("MMM", Some(70.0))];
        let ranked = rank(rows, SortPolarity::Descending, None);
        assert_eq!(symbols(&ranked), vec!["AAA", "MMM", "ZZZ"]);
    }

    #[test]
    fn test_limit_takes_head() {
        let ranked = rank(sample(), SortPolarity::Descending, Some(2));
        assert_eq!(symbols(&ranked), vec!["HIGH", "MID"]);
    }

    #[test]
    fn test_limit_above_count_returns_all() {
        let ranked = rank(sample(), SortPolarity::Descending, Some(50));
        assert_eq!(ranked.len(), 5);
    }

    #[test]
    fn test_rank_is_independent_of_input_order() {
        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(
            rank(sample(), SortPolarity::Ascending, None),
            rank(reversed, SortPolarity::Ascending, None)
        );
    }

    #[test]
    fn test_is_ranked_detects_null_before_value() {
        let rows = vec![row("A", None), row("B", Some(1.0))];
        assert!(!is_ranked(&rows, SortPolarity::Descending));
        assert!(!is_ranked(&rows, SortPolarity::Ascending));
    }
}
