//! In-memory bar snapshot.
//!
//! Bars are held twice by reference: grouped by date for screen predicates,
//! and per `(symbol, interval)` in a `BTreeMap` keyed by date so the previous
//! trading day is an O(log n) range lookup.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{BarStore, StoreResult};
use crate::models::{Bar, Candle, MatchedBar};
use crate::screen::{ranker, ScreenQuery};

/// Date-ordered bars of one symbol at one interval.
type History = BTreeMap<NaiveDate, Arc<Bar>>;

/// Immutable snapshot of the bar table.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    by_date: HashMap<NaiveDate, Vec<Arc<Bar>>>,
    /// symbol -> interval -> history
    by_symbol: HashMap<String, BTreeMap<String, History>>,
}

impl MemoryBarStore {
    /// Index a set of bars. A later bar with the same
    /// `(symbol, interval, date)` replaces an earlier one.
    pub fn new(bars: impl IntoIterator<Item = Bar>) -> Self {
        let mut by_symbol: HashMap<String, BTreeMap<String, History>> = HashMap::new();
        for bar in bars {
            by_symbol
                .entry(bar.symbol.clone())
                .or_default()
                .entry(bar.interval.clone())
                .or_default()
                .insert(bar.date, Arc::new(bar));
        }

        let mut by_date: HashMap<NaiveDate, Vec<Arc<Bar>>> = HashMap::new();
        for history in by_symbol.values().flat_map(BTreeMap::values) {
            for (date, bar) in history {
                by_date.entry(*date).or_default().push(Arc::clone(bar));
            }
        }

        Self { by_date, by_symbol }
    }

    /// Number of bars in the snapshot.
    pub fn len(&self) -> usize {
        self.histories().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    fn histories(&self) -> impl Iterator<Item = &History> {
        self.by_symbol.values().flat_map(BTreeMap::values)
    }

    /// Every interval's history of `symbol`, in interval order.
    fn symbol_histories<'a>(&'a self, symbol: &str) -> impl Iterator<Item = &'a History> {
        self.by_symbol
            .get(symbol)
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// Latest bar of the same symbol and interval strictly before `bar`.
    fn previous_bar(&self, bar: &Bar) -> Option<&Arc<Bar>> {
        self.by_symbol
            .get(&bar.symbol)
            .and_then(|intervals| intervals.get(&bar.interval))
            .and_then(|history| history.range(..bar.date).next_back())
            .map(|(_, prev)| prev)
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, query: &ScreenQuery) -> StoreResult<Vec<MatchedBar>> {
        let predicate = &query.predicate;
        let rows = self
            .by_date
            .get(&predicate.date)
            .map(|bars| {
                bars.iter()
                    .filter(|bar| predicate.matches(bar))
                    .map(|bar| {
                        let prev_close = if query.with_previous_close {
                            self.previous_bar(bar).map(|prev| prev.close)
                        } else {
                            None
                        };
                        bar.to_matched(prev_close)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ranker::rank(rows, query.polarity, query.limit))
    }

    async fn max_date_before(&self, symbol: &str, date: NaiveDate) -> StoreResult<Option<NaiveDate>> {
        Ok(self
            .symbol_histories(symbol)
            .filter_map(|history| history.range(..date).next_back().map(|(d, _)| *d))
            .max())
    }

    async fn max_date(&self, symbol: &str) -> StoreResult<Option<NaiveDate>> {
        Ok(self
            .symbol_histories(symbol)
            .filter_map(|history| history.keys().next_back().copied())
            .max())
    }

    async fn bars_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Candle>> {
        if start > end {
            return Ok(Vec::new());
        }

        // Interval order is kept among equal dates by the stable sort
        let mut candles: Vec<Candle> = self
            .symbol_histories(symbol)
            .flat_map(|history| history.range(start..=end).map(|(_, bar)| bar.to_candle()))
            .collect();
        candles.sort_by_key(|candle| candle.date);

        Ok(candles)
    }
}
