//! Close-to-close move against the previous trading day.
//!
//! "Previous trading day" is the latest bar strictly before the matched
//! bar's date for the same symbol, never `date - 1`: holidays and missing
//! data leave gaps in every history.

use crate::models::{MatchedBar, SymbolWithPrice};

/// Price fields of the priced response shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDelta {
    pub last_price: f64,
    pub prev_close: Option<f64>,
    pub price_change: Option<f64>,
    pub percent_change: Option<f64>,
}

impl PriceDelta {
    /// Compute the move from `prev_close` to `last_price`.
    ///
    /// `percent_change` is only defined for a strictly positive previous
    /// close; zero or negative closes yield `None` rather than an infinite
    /// or sign-flipped percentage.
    pub fn compute(last_price: f64, prev_close: Option<f64>) -> Self {
        let price_change = prev_close.map(|prev| last_price - prev);
        let percent_change = match (price_change, prev_close) {
            (Some(change), Some(prev)) if prev > 0.0 => Some(change / prev * 100.0),
            _ => None,
        };

        Self {
            last_price,
            prev_close,
            price_change,
            percent_change,
        }
    }
}

impl From<MatchedBar> for SymbolWithPrice {
    fn from(bar: MatchedBar) -> Self {
        let delta = PriceDelta::compute(bar.close, bar.prev_close);
        Self {
            symbol: bar.symbol,
            instrument_type: bar.instrument_type,
            last_price: Some(delta.last_price),
            prev_close: delta.prev_close,
            price_change: delta.price_change,
            percent_change: delta.percent_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_regular_move() {
        let delta = PriceDelta::compute(110.0, Some(100.0));
        assert_eq!(delta.prev_close, Some(100.0));
        assert!((delta.price_change.unwrap() - 10.0).abs() < 1e-9);
        assert!((delta.percent_change.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_down_move() {
        let delta = PriceDelta::compute(45.0, Some(50.0));
        assert!((delta.price_change.unwrap() + 5.0).abs() < 1e-9);
        assert!((delta.percent_change.unwrap() + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_previous_bar() {
        let delta = PriceDelta::compute(12.5, None);
        assert_eq!(delta.last_price, 12.5);
        assert_eq!(delta.prev_close, None);
        assert_eq!(delta.price_change, None);
        assert_eq!(delta.percent_change, None);
    }

    #[test]
    fn test_zero_previous_close_has_no_percent() {
        let delta = PriceDelta::compute(3.0, Some(0.0));
        assert_eq!(delta.price_change, Some(3.0));
        assert_eq!(delta.percent_change, None);
    }

    #[test]
    fn test_negative_previous_close_has_no_percent() {
        let delta = PriceDelta::compute(1.0, Some(-2.0));
        assert_eq!(delta.price_change, Some(3.0));
        assert_eq!(delta.percent_change, None);
    }

    #[test]
    fn test_matched_bar_to_priced_row() {
        let row: SymbolWithPrice = MatchedBar {
            symbol: "MSFT".into(),
            instrument_type: "stock".into(),
            interval: "1day".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            close: 40.0,
            rs: Some(80.0),
            prev_close: Some(50.0),
        }
        .into();

        assert_eq!(row.last_price, Some(40.0));
        assert_eq!(row.prev_close, Some(50.0));
        assert_eq!(row.price_change, Some(-10.0));
        assert!((row.percent_change.unwrap() + 20.0).abs() < 1e-9);
    }
}
