//! Screen criteria: validation of raw request parameters and their
//! resolution into a store predicate with a fixed sort polarity.
//!
//! Every indicator a screen can filter on is a variant of
//! [`IndicatorColumn`]; column names only ever come from that enumeration,
//! so unknown discriminants fail closed before the store is touched.

use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

use crate::error::ScreenError;
use crate::models::{iso_date, Bar};

// ============================================================================
// Discriminants
// ============================================================================

/// Lookback for new-high / new-low screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// One quarter of trading days
    Days63,
    /// One year of trading days
    Days252,
}

impl Period {
    pub const fn days(self) -> u32 {
        match self {
            Self::Days63 => 63,
            Self::Days252 => 252,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ScreenError> {
        match raw.trim() {
            "63" => Ok(Self::Days63),
            "252" => Ok(Self::Days252),
            _ => Err(ScreenError::invalid("period", "must be 63 or 252")),
        }
    }
}

/// Direction of a new signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Buy,
    Sell,
}

impl SignalKind {
    /// Stored `signal` value for this direction.
    pub const fn value(self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ScreenError> {
        match raw {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            _ => Err(ScreenError::invalid("signal", "must be 'buy' or 'sell'")),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Direction in which price crossed a swing pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrossDirection {
    Up,
    Down,
}

impl CrossDirection {
    pub fn parse(raw: &str) -> Result<Self, ScreenError> {
        match raw {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(ScreenError::invalid("direction", "must be 'up' or 'down'")),
        }
    }
}

impl fmt::Display for CrossDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Which swing pivot a cross refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwingSide {
    High,
    Low,
}

// ============================================================================
// Indicator columns
// ============================================================================

/// Closed set of indicator flags a screen may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorColumn {
    IsHigh63,
    IsHigh252,
    IsLow63,
    IsLow252,
    IsGapUp,
    IsGapDown,
    SwingHighCrossUp,
    SwingHighCrossDown,
    SwingLowCrossUp,
    SwingLowCrossDown,
    SignalChange,
    IsRs52WeekHigh,
}

impl IndicatorColumn {
    /// Column identifier in `stock_data_daily`.
    pub const fn column_name(self) -> &'static str {
        match self {
            Self::IsHigh63 => "is_high_63",
            Self::IsHigh252 => "is_high_252",
            Self::IsLow63 => "is_low_63",
            Self::IsLow252 => "is_low_252",
            Self::IsGapUp => "is_gap_up",
            Self::IsGapDown => "is_gap_down",
            Self::SwingHighCrossUp => "swing_high_cross_up",
            Self::SwingHighCrossDown => "swing_high_cross_down",
            Self::SwingLowCrossUp => "swing_low_cross_up",
            Self::SwingLowCrossDown => "swing_low_cross_down",
            Self::SignalChange => "signal_change",
            Self::IsRs52WeekHigh => "is_rs_52_week_high",
        }
    }
}

/// Sort direction on `rs`. Nulls sort last either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortPolarity {
    Ascending,
    Descending,
}

/// Output shape of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    /// `{symbol, type}`
    Identity,
    /// `{symbol, type}` plus the previous-trading-day price move
    Priced,
}

// ============================================================================
// Screens
// ============================================================================

/// A fully validated screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    NewHigh(Period),
    NewLow(Period),
    GapUp,
    GapDown,
    SwingCross {
        side: SwingSide,
        direction: CrossDirection,
    },
    NewSignal(SignalKind),
    RsHigh52Week,
}

impl Screen {
    /// Indicator flag that must equal 1.
    pub const fn indicator(&self) -> IndicatorColumn {
        match *self {
            Self::NewHigh(Period::Days63) => IndicatorColumn::IsHigh63,
            Self::NewHigh(Period::Days252) => IndicatorColumn::IsHigh252,
            Self::NewLow(Period::Days63) => IndicatorColumn::IsLow63,
            Self::NewLow(Period::Days252) => IndicatorColumn::IsLow252,
            Self::GapUp => IndicatorColumn::IsGapUp,
            Self::GapDown => IndicatorColumn::IsGapDown,
            Self::SwingCross { side, direction } => match (side, direction) {
                (SwingSide::High, CrossDirection::Up) => IndicatorColumn::SwingHighCrossUp,
                (SwingSide::High, CrossDirection::Down) => IndicatorColumn::SwingHighCrossDown,
                (SwingSide::Low, CrossDirection::Up) => IndicatorColumn::SwingLowCrossUp,
                (SwingSide::Low, CrossDirection::Down) => IndicatorColumn::SwingLowCrossDown,
            },
            Self::NewSignal(_) => IndicatorColumn::SignalChange,
            Self::RsHigh52Week => IndicatorColumn::IsRs52WeekHigh,
        }
    }

    /// Extra `signal = v` equality, for new-signal screens only.
    pub const fn signal_value(&self) -> Option<i8> {
        match *self {
            Self::NewSignal(kind) => Some(kind.value()),
            _ => None,
        }
    }

    /// Bearish screens rank the weakest names first.
    pub const fn polarity(&self) -> SortPolarity {
        match self {
            Self::NewLow(_) | Self::GapDown => SortPolarity::Ascending,
            _ => SortPolarity::Descending,
        }
    }

    /// Message used when nothing matched on `date`.
    pub fn not_found_message(&self, date: NaiveDate) -> String {
        let date = date.format(iso_date::FORMAT);
        match self {
            Self::NewHigh(period) => {
                format!("No new highs found for {} and period {}", date, period.days())
            }
            Self::NewLow(period) => {
                format!("No new lows found for {} and period {}", date, period.days())
            }
            Self::GapUp => format!("No gap up data found for {}", date),
            Self::GapDown => format!("No gap down data found for {}", date),
            Self::SwingCross { side, direction } => {
                let side = match side {
                    SwingSide::High => "high",
                    SwingSide::Low => "low",
                };
                format!("No swing {} cross {} found for {}", side, direction, date)
            }
            Self::NewSignal(kind) => format!("No new {}s found for {}", kind, date),
            Self::RsHigh52Week => format!("No 52-week RS high data found for {}", date),
        }
    }
}

/// Screen families as exposed over HTTP, before their discriminant is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    NewHighs,
    NewLows,
    GapUp,
    GapDown,
    SwingHighCross,
    SwingLowCross,
    NewSignals,
    RsHigh52Week,
}

impl ScreenKind {
    pub const ALL: [ScreenKind; 8] = [
        Self::NewHighs,
        Self::NewLows,
        Self::GapUp,
        Self::GapDown,
        Self::SwingHighCross,
        Self::SwingLowCross,
        Self::NewSignals,
        Self::RsHigh52Week,
    ];

    /// Route paths serving this kind; the first one is canonical.
    pub const fn paths(self) -> &'static [&'static str] {
        match self {
            Self::NewHighs => &["/new-highs"],
            Self::NewLows => &["/new-lows"],
            Self::GapUp => &["/gapup"],
            Self::GapDown => &["/gapdown"],
            Self::SwingHighCross => &["/swing-high-cross"],
            Self::SwingLowCross => &["/swing-low-cross"],
            Self::NewSignals => &["/new-signals"],
            Self::RsHigh52Week => &["/relative-strength/52-week", "/52-week-relative-strength"],
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Raw query parameters shared by every screen endpoint.
///
/// Everything arrives as text so that malformed values are reported as
/// `InvalidArgument` naming the parameter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreenParams {
    pub date: Option<String>,
    pub limit: Option<String>,
    pub period: Option<String>,
    pub signal: Option<String>,
    pub direction: Option<String>,
}

/// A validated screen on a date, with an optional row cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRequest {
    pub screen: Screen,
    pub date: NaiveDate,
    pub limit: Option<usize>,
}

impl ScreenRequest {
    pub fn new(screen: Screen, date: NaiveDate) -> Self {
        Self {
            screen,
            date,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validate raw parameters for a screen family.
    ///
    /// The date is checked first, then the limit, then the family's own
    /// discriminant.
    pub fn resolve(kind: ScreenKind, params: &ScreenParams) -> Result<Self, ScreenError> {
        let date = parse_date(params.date.as_deref())?;
        let limit = parse_limit(params.limit.as_deref())?;

        let screen = match kind {
            ScreenKind::NewHighs => Screen::NewHigh(Period::parse(required(
                "period",
                params.period.as_deref(),
            )?)?),
            ScreenKind::NewLows => Screen::NewLow(Period::parse(required(
                "period",
                params.period.as_deref(),
            )?)?),
            ScreenKind::GapUp => Screen::GapUp,
            ScreenKind::GapDown => Screen::GapDown,
            ScreenKind::SwingHighCross => Screen::SwingCross {
                side: SwingSide::High,
                direction: CrossDirection::parse(required(
                    "direction",
                    params.direction.as_deref(),
                )?)?,
            },
            ScreenKind::SwingLowCross => Screen::SwingCross {
                side: SwingSide::Low,
                direction: CrossDirection::parse(required(
                    "direction",
                    params.direction.as_deref(),
                )?)?,
            },
            ScreenKind::NewSignals => Screen::NewSignal(SignalKind::parse(required(
                "signal",
                params.signal.as_deref(),
            )?)?),
            ScreenKind::RsHigh52Week => Screen::RsHigh52Week,
        };

        Ok(Self {
            screen,
            date,
            limit,
        })
    }

    /// The store query for this request.
    pub fn query(&self, projection: Projection) -> ScreenQuery {
        ScreenQuery {
            predicate: Predicate {
                date: self.date,
                indicator: self.screen.indicator(),
                signal: self.screen.signal_value(),
            },
            polarity: self.screen.polarity(),
            limit: self.limit,
            with_previous_close: projection == Projection::Priced,
        }
    }
}

/// `date = D AND <indicator> = 1 [AND signal = v]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    pub date: NaiveDate,
    pub indicator: IndicatorColumn,
    pub signal: Option<i8>,
}

impl Predicate {
    pub fn matches(&self, bar: &Bar) -> bool {
        bar.date == self.date
            && bar.flag(self.indicator) == Some(true)
            && self.signal.map_or(true, |v| bar.signal == Some(v))
    }
}

/// Everything a store needs to answer one screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenQuery {
    pub predicate: Predicate,
    pub polarity: SortPolarity,
    pub limit: Option<usize>,
    /// Also look up each match's previous close.
    pub with_previous_close: bool,
}

// ============================================================================
// Parameter parsing
// ============================================================================

fn required<'a>(parameter: &'static str, raw: Option<&'a str>) -> Result<&'a str, ScreenError> {
    raw.ok_or_else(|| ScreenError::invalid(parameter, "is required"))
}

/// Parse an ISO calendar date, exactly `YYYY-MM-DD`.
///
/// chrono alone accepts unpadded fields and a leading sign, so the shape is
/// checked first.
pub fn parse_date(raw: Option<&str>) -> Result<NaiveDate, ScreenError> {
    let raw = required("date", raw)?;
    let invalid = || ScreenError::invalid("date", "use YYYY-MM-DD");

    if !is_iso_date_shape(raw) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(raw, iso_date::FORMAT).map_err(|_| invalid())
}

/// `dddd-dd-dd` with ASCII digits.
fn is_iso_date_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Parse an optional positive row cap. Absent means unbounded.
pub fn parse_limit(raw: Option<&str>) -> Result<Option<usize>, ScreenError> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(limit) if limit >= 1 => Ok(Some(limit)),
            _ => Err(ScreenError::invalid("limit", "must be a positive integer")),
        },
    }
}
