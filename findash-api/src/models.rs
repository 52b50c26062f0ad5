//! Bar records and the response shapes projected from them.

use chrono::NaiveDate;
use serde::Serialize;

use crate::screen::IndicatorColumn;

/// One daily bar for a symbol, with its precomputed indicators.
///
/// Boolean indicators are `None` when the upstream pipeline had too little
/// history to compute them; the same holds for the numeric ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub name: String,
    pub instrument_type: String,
    pub interval: String,
    pub date: NaiveDate,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
    pub avg_volume: Option<f64>,

    // Swing structure
    pub is_swing_high: Option<bool>,
    pub swing_high: Option<f64>,
    pub swing_high_cross_up: Option<bool>,
    pub swing_high_cross_down: Option<bool>,
    pub is_swing_low: Option<bool>,
    pub swing_low: Option<f64>,
    pub swing_low_cross_up: Option<bool>,
    pub swing_low_cross_down: Option<bool>,

    // Relative strength
    pub rs: Option<f64>,
    pub is_rs_52_week_high: Option<bool>,

    // Trend and volatility
    pub atr: Option<f64>,
    pub ema_10: Option<f64>,
    pub ema_21: Option<f64>,
    pub ema_50: Option<f64>,
    pub ema_200: Option<f64>,
    pub rsi_14: Option<f64>,

    // Bar shape
    pub is_gap_up: Option<bool>,
    pub is_gap_down: Option<bool>,
    pub is_doji_bar: Option<bool>,
    pub is_bull_bar: Option<bool>,
    pub is_bear_bar: Option<bool>,

    // Breakouts
    pub is_high_63: Option<bool>,
    pub is_high_252: Option<bool>,
    pub is_low_63: Option<bool>,
    pub is_low_252: Option<bool>,

    // Signal state: -1 sell, 0 neutral, 1 buy
    pub buy_signal: Option<bool>,
    pub sell_signal: Option<bool>,
    pub signal: Option<i8>,
    pub signal_change: Option<bool>,
}

impl Bar {
    /// Value of a screenable indicator flag on this bar.
    pub fn flag(&self, column: IndicatorColumn) -> Option<bool> {
        match column {
            IndicatorColumn::IsHigh63 => self.is_high_63,
            IndicatorColumn::IsHigh252 => self.is_high_252,
            IndicatorColumn::IsLow63 => self.is_low_63,
            IndicatorColumn::IsLow252 => self.is_low_252,
            IndicatorColumn::IsGapUp => self.is_gap_up,
            IndicatorColumn::IsGapDown => self.is_gap_down,
            IndicatorColumn::SwingHighCrossUp => self.swing_high_cross_up,
            IndicatorColumn::SwingHighCrossDown => self.swing_high_cross_down,
            IndicatorColumn::SwingLowCrossUp => self.swing_low_cross_up,
            IndicatorColumn::SwingLowCrossDown => self.swing_low_cross_down,
            IndicatorColumn::SignalChange => self.signal_change,
            IndicatorColumn::IsRs52WeekHigh => self.is_rs_52_week_high,
        }
    }

    /// Project to the row a screen query returns.
    pub fn to_matched(&self, prev_close: Option<f64>) -> MatchedBar {
        MatchedBar {
            symbol: self.symbol.clone(),
            instrument_type: self.instrument_type.clone(),
            interval: self.interval.clone(),
            date: self.date,
            close: self.close,
            rs: self.rs,
            prev_close,
        }
    }

    /// Project to a chart candle.
    pub fn to_candle(&self) -> Candle {
        Candle {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            ema_21: self.ema_21,
            ema_200: self.ema_200,
        }
    }
}

/// A bar that satisfied a screen predicate, as returned by the store.
///
/// `prev_close` is only populated when the query asked for it, and always
/// comes from the same `interval`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedBar {
    pub symbol: String,
    pub instrument_type: String,
    pub interval: String,
    pub date: NaiveDate,
    pub close: f64,
    pub rs: Option<f64>,
    pub prev_close: Option<f64>,
}

/// Identity shape of a screen result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolType {
    pub symbol: String,
    #[serde(rename = "type")]
    pub instrument_type: String,
}

/// Identity shape plus the close-to-close move from the previous trading day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolWithPrice {
    pub symbol: String,
    #[serde(rename = "type")]
    pub instrument_type: String,
    pub last_price: Option<f64>,
    pub prev_close: Option<f64>,
    pub price_change: Option<f64>,
    pub percent_change: Option<f64>,
}

/// One OHLCV point of a price history, in chart-ready form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    #[serde(rename = "time", with = "iso_date")]
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub ema_21: Option<f64>,
    pub ema_200: Option<f64>,
}

/// `YYYY-MM-DD` serialization for bar dates.
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_serializes_type_field() {
        let row = SymbolType {
            symbol: "AAPL".into(),
            instrument_type: "stock".into(),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"symbol":"AAPL","type":"stock"}"#);
    }

    #[test]
    fn test_candle_serializes_time_as_iso_date() {
        let candle = Candle {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 100,
            ema_21: None,
            ema_200: Some(1.2),
        };
        let json = serde_json::to_value(&candle).unwrap();
        assert_eq!(json["time"], "2024-03-05");
        assert!(json["ema_21"].is_null());
        assert_eq!(json["ema_200"], 1.2);
    }

    #[test]
    fn test_flag_lookup_follows_column() {
        let bar = Bar {
            is_high_252: Some(true),
            is_low_63: Some(false),
            ..Default::default()
        };
        assert_eq!(bar.flag(IndicatorColumn::IsHigh252), Some(true));
        assert_eq!(bar.flag(IndicatorColumn::IsLow63), Some(false));
        assert_eq!(bar.flag(IndicatorColumn::IsGapUp), None);
    }
}
