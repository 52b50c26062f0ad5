//! Screening engine.
//!
//! One evaluation path serves every screen in both output shapes: the
//! request is already validated, the store answers a single [`ScreenQuery`],
//! and the result is projected per [`Projection`]. Store failures are logged
//! here with full detail and leave as the opaque `StorageUnavailable`.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::ScreenError;
use crate::models::{Candle, MatchedBar, SymbolType, SymbolWithPrice};
use crate::screen::{ranker, Projection, ScreenRequest};
use crate::store::{BarStore, StoreError};
use findash_common::validation::MAX_HISTORY_DAYS;

/// Result of a screen in the requested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScreenOutput {
    Identity(Vec<SymbolType>),
    Priced(Vec<SymbolWithPrice>),
}

impl ScreenOutput {
    fn project(rows: Vec<MatchedBar>, projection: Projection) -> Self {
        match projection {
            Projection::Identity => Self::Identity(
                rows.into_iter()
                    .map(|row| SymbolType {
                        symbol: row.symbol,
                        instrument_type: row.instrument_type,
                    })
                    .collect(),
            ),
            Projection::Priced => Self::Priced(rows.into_iter().map(SymbolWithPrice::from).collect()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Identity(rows) => rows.len(),
            Self::Priced(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Screens, freshness and price history over a [`BarStore`].
#[derive(Clone)]
pub struct ScreenEngine {
    store: Arc<dyn BarStore>,
    reference_symbol: String,
    default_history_days: u32,
}

impl ScreenEngine {
    pub fn new(store: Arc<dyn BarStore>, reference_symbol: impl Into<String>, default_history_days: u32) -> Self {
        Self {
            store,
            reference_symbol: reference_symbol.into(),
            default_history_days,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Run a validated screen and project its rows.
    ///
    /// Zero matching rows is `NotFound`, never an empty success.
    pub async fn screen(
        &self,
        request: &ScreenRequest,
        projection: Projection,
    ) -> Result<ScreenOutput, ScreenError> {
        let query = request.query(projection);
        let rows = self
            .store
            .fetch(&query)
            .await
            .map_err(|e| storage_failure("fetch", e))?;

        if rows.is_empty() {
            return Err(ScreenError::not_found(
                request.screen.not_found_message(request.date),
            ));
        }

        let rows = if ranker::is_ranked(&rows, query.polarity) {
            rows
        } else {
            warn!(
                backend = self.store.backend(),
                screen = ?request.screen,
                "Store returned unranked rows, re-ranking"
            );
            ranker::rank(rows, query.polarity, query.limit)
        };

        debug!(
            screen = ?request.screen,
            date = %request.date,
            projection = ?projection,
            rows = rows.len(),
            "Screen evaluated"
        );

        Ok(ScreenOutput::project(rows, projection))
    }

    /// Latest bar date of the reference symbol.
    pub async fn latest_date(&self) -> Result<NaiveDate, ScreenError> {
        self.store
            .max_date(&self.reference_symbol)
            .await
            .map_err(|e| storage_failure("max_date", e))?
            .ok_or_else(|| {
                ScreenError::not_found(format!("No data found for {}", self.reference_symbol))
            })
    }

    /// Bars of `symbol` within `[today - days, today]`, ascending.
    ///
    /// `days` is the raw parameter; absent means the configured default.
    pub async fn price_history(
        &self,
        symbol: &str,
        days: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<Candle>, ScreenError> {
        let days = match days {
            Some(raw) => parse_days(raw)?,
            None => self.default_history_days,
        };
        let symbol = symbol.trim().to_uppercase();
        let start = today - Duration::days(i64::from(days));

        let candles = self
            .store
            .bars_between(&symbol, start, today)
            .await
            .map_err(|e| storage_failure("bars_between", e))?;

        if candles.is_empty() {
            return Err(ScreenError::not_found(format!(
                "No price data found for symbol {}",
                symbol
            )));
        }

        debug!(symbol = %symbol, days, rows = candles.len(), "Price history loaded");
        Ok(candles)
    }
}

/// Parse a history day count in `1..=MAX_HISTORY_DAYS`.
pub fn parse_days(raw: &str) -> Result<u32, ScreenError> {
    match raw.trim().parse::<u32>() {
        Ok(days) if (1..=MAX_HISTORY_DAYS).contains(&days) => Ok(days),
        _ => Err(ScreenError::invalid(
            "days",
            format!("must be an integer between 1 and {}", MAX_HISTORY_DAYS),
        )),
    }
}

fn storage_failure(operation: &'static str, err: StoreError) -> ScreenError {
    error!(operation, error = %err, "Bar store query failed");
    ScreenError::StorageUnavailable
}
