//! Bar storage boundary.
//!
//! The screening engine only reads through [`BarStore`]. Two backends:
//! - [`SqliteBarStore`]: the `stock_data_daily` table in a SQLite file
//! - [`MemoryBarStore`]: an immutable in-memory snapshot with per-date and
//!   per-symbol indexes

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Candle, MatchedBar};
use crate::screen::ScreenQuery;

pub use memory::MemoryBarStore;
pub use sqlite::SqliteBarStore;

/// Storage failures. Never shown to API clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row for {symbol}: {reason}")]
    Corrupt { symbol: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read-only access to daily bars.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Rows satisfying `query.predicate`, ranked per `query.polarity`
    /// (nulls last, symbol ascending on ties) and truncated to `query.limit`.
    /// When `query.with_previous_close` is set every row carries the close of
    /// the latest earlier bar of its symbol.
    async fn fetch(&self, query: &ScreenQuery) -> StoreResult<Vec<MatchedBar>>;

    /// Latest bar date strictly before `date` for `symbol`.
    async fn max_date_before(&self, symbol: &str, date: NaiveDate) -> StoreResult<Option<NaiveDate>>;

    /// Latest bar date for `symbol`.
    async fn max_date(&self, symbol: &str) -> StoreResult<Option<NaiveDate>>;

    /// Bars of `symbol` with `start <= date <= end`, ascending by date.
    async fn bars_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Candle>>;
}
