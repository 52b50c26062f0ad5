//! Screening query layer.
//!
//! - [`criteria`] validates request parameters and resolves them into a
//!   store predicate with a fixed sort polarity
//! - [`price_delta`] turns a match and its previous close into the priced
//!   response fields
//! - [`ranker`] orders matches by relative strength and applies the limit

pub mod criteria;
pub mod price_delta;
pub mod ranker;

pub use criteria::{
    CrossDirection, IndicatorColumn, Period, Predicate, Projection, Screen, ScreenKind,
    ScreenParams, ScreenQuery, ScreenRequest, SignalKind, SortPolarity, SwingSide,
};
pub use price_delta::PriceDelta;
