//! SQLite bar store over the `stock_data_daily` table.
//!
//! The table is populated out of band by the indicator pipeline; this
//! module only bootstraps the schema when it is missing and reads from it.

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{BarStore, MemoryBarStore, StoreError, StoreResult};
use crate::models::{iso_date, Bar, Candle, MatchedBar};
use crate::screen::{ScreenQuery, SortPolarity};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stock_data_daily (
    symbol TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL,
    interval TEXT NOT NULL DEFAULT '1day',
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    adjusted_close REAL NOT NULL,
    volume INTEGER NOT NULL,
    avg_volume REAL,
    is_swing_high INTEGER,
    swing_high REAL,
    swing_high_cross_up INTEGER,
    swing_high_cross_down INTEGER,
    is_swing_low INTEGER,
    swing_low REAL,
    swing_low_cross_up INTEGER,
    swing_low_cross_down INTEGER,
    rs REAL,
    is_rs_52_week_high INTEGER,
    atr REAL,
    is_gap_up INTEGER,
    is_gap_down INTEGER,
    is_doji_bar INTEGER,
    is_bull_bar INTEGER,
    is_bear_bar INTEGER,
    ema_10 REAL,
    ema_21 REAL,
    ema_50 REAL,
    ema_200 REAL,
    rsi_14 REAL,
    is_high_63 INTEGER,
    is_high_252 INTEGER,
    is_low_63 INTEGER,
    is_low_252 INTEGER,
    buy_signal INTEGER,
    sell_signal INTEGER,
    signal INTEGER,
    signal_change INTEGER,
    UNIQUE(symbol, interval, date)
);

CREATE INDEX IF NOT EXISTS idx_stock_data_daily_date
ON stock_data_daily(date);

CREATE INDEX IF NOT EXISTS idx_stock_data_daily_symbol_date
ON stock_data_daily(symbol, date DESC);
"#;

/// Correlated lookup of the previous trading day's close, evaluated in the
/// same statement as the match so both come from one snapshot.
const PREV_CLOSE_SQL: &str = "(SELECT prev.close FROM stock_data_daily prev \
     WHERE prev.symbol = cur.symbol AND prev.interval = cur.interval AND prev.date < cur.date \
     ORDER BY prev.date DESC LIMIT 1)";

// ============================================================================
// SQLite Store
// ============================================================================

/// Bar store backed by a SQLite database file.
pub struct SqliteBarStore {
    /// rusqlite::Connection is Send but not Sync, so it sits behind a Mutex
    db: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteBarStore {
    /// Open the database at `path`, creating the bar table if it is missing.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(CREATE_TABLES_SQL)?;

        info!(db_path = %path.display(), "Opened bar store");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole table into an indexed in-memory snapshot.
    pub async fn load_snapshot(&self) -> StoreResult<MemoryBarStore> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare("SELECT * FROM stock_data_daily")?;
        let bars = stmt
            .query_map([], row_to_bar)?
            .collect::<Result<Vec<_>, _>>()?;

        info!(bars = bars.len(), "Loaded bar snapshot");
        Ok(MemoryBarStore::new(bars))
    }
}

#[async_trait]
impl BarStore for SqliteBarStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch(&self, query: &ScreenQuery) -> StoreResult<Vec<MatchedBar>> {
        let (sql, values) = screen_sql(query);
        debug!(sql = %sql, "Running screen query");

        let db = self.db.lock().await;
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(MatchedBar {
                    symbol: row.get(0)?,
                    instrument_type: row.get(1)?,
                    interval: row.get(2)?,
                    date: date_column(row, 3)?,
                    close: row.get(4)?,
                    rs: row.get(5)?,
                    prev_close: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    async fn max_date_before(&self, symbol: &str, date: NaiveDate) -> StoreResult<Option<NaiveDate>> {
        let db = self.db.lock().await;
        let raw: Option<String> = db.query_row(
            "SELECT MAX(date) FROM stock_data_daily WHERE symbol = ?1 AND date < ?2",
            params![symbol, date_param(date)],
            |row| row.get(0),
        )?;

        raw.map(|raw| parse_stored_date(symbol, &raw)).transpose()
    }

    async fn max_date(&self, symbol: &str) -> StoreResult<Option<NaiveDate>> {
        let db = self.db.lock().await;
        let raw: Option<String> = db
            .query_row(
                "SELECT MAX(date) FROM stock_data_daily WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        raw.map(|raw| parse_stored_date(symbol, &raw)).transpose()
    }

    async fn bars_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Candle>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT date, open, high, low, close, volume, ema_21, ema_200
             FROM stock_data_daily
             WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC, interval ASC",
        )?;

        let candles = stmt
            .query_map(params![symbol, date_param(start), date_param(end)], |row| {
                Ok(Candle {
                    date: date_column(row, 0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: volume_column(row, 5)?,
                    ema_21: row.get(6)?,
                    ema_200: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(candles)
    }
}

// ============================================================================
// SQL building
// ============================================================================

/// Build the statement and bound values for a screen query.
///
/// The indicator column comes from the closed `IndicatorColumn` set; the
/// date, signal value and limit are always bound parameters.
fn screen_sql(query: &ScreenQuery) -> (String, Vec<Value>) {
    let predicate = &query.predicate;
    let mut values = vec![Value::Text(date_param(predicate.date))];

    let prev_close = if query.with_previous_close {
        PREV_CLOSE_SQL
    } else {
        "NULL"
    };

    let mut sql = format!(
        "SELECT cur.symbol, cur.type, cur.interval, cur.date, cur.close, cur.rs, {} AS prev_close
         FROM stock_data_daily cur
         WHERE cur.date = ? AND cur.{} = 1",
        prev_close,
        predicate.indicator.column_name(),
    );

    if let Some(signal) = predicate.signal {
        sql.push_str(" AND cur.signal = ?");
        values.push(Value::Integer(i64::from(signal)));
    }

    let direction = match query.polarity {
        SortPolarity::Ascending => "ASC",
        SortPolarity::Descending => "DESC",
    };
    sql.push_str(&format!(
        " ORDER BY cur.rs {} NULLS LAST, cur.symbol ASC, cur.interval ASC",
        direction
    ));

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    (sql, values)
}

// ============================================================================
// Row mapping
// ============================================================================

fn date_param(date: NaiveDate) -> String {
    date.format(iso_date::FORMAT).to_string()
}

fn parse_stored_date(symbol: &str, raw: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, iso_date::FORMAT).map_err(|e| StoreError::Corrupt {
        symbol: symbol.to_string(),
        reason: format!("date {:?}: {}", raw, e),
    })
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, iso_date::FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Volume is declared INTEGER but some loaders write REAL.
fn volume_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    let volume: f64 = row.get(idx)?;
    Ok(volume.round() as i64)
}

fn row_to_bar(row: &Row<'_>) -> rusqlite::Result<Bar> {
    let date_idx = row.as_ref().column_index("date")?;
    let volume_idx = row.as_ref().column_index("volume")?;

    Ok(Bar {
        symbol: row.get("symbol")?,
        name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
        instrument_type: row.get("type")?,
        interval: row.get("interval")?,
        date: date_column(row, date_idx)?,
        open: row.get("open")?,
        high: row.get("high")?,
        low: row.get("low")?,
        close: row.get("close")?,
        adjusted_close: row.get("adjusted_close")?,
        volume: volume_column(row, volume_idx)?,
        avg_volume: row.get("avg_volume")?,
        is_swing_high: row.get("is_swing_high")?,
        swing_high: row.get("swing_high")?,
        swing_high_cross_up: row.get("swing_high_cross_up")?,
        swing_high_cross_down: row.get("swing_high_cross_down")?,
        is_swing_low: row.get("is_swing_low")?,
        swing_low: row.get("swing_low")?,
        swing_low_cross_up: row.get("swing_low_cross_up")?,
        swing_low_cross_down: row.get("swing_low_cross_down")?,
        rs: row.get("rs")?,
        is_rs_52_week_high: row.get("is_rs_52_week_high")?,
        atr: row.get("atr")?,
        ema_10: row.get("ema_10")?,
        ema_21: row.get("ema_21")?,
        ema_50: row.get("ema_50")?,
        ema_200: row.get("ema_200")?,
        rsi_14: row.get("rsi_14")?,
        is_gap_up: row.get("is_gap_up")?,
        is_gap_down: row.get("is_gap_down")?,
        is_doji_bar: row.get("is_doji_bar")?,
        is_bull_bar: row.get("is_bull_bar")?,
        is_bear_bar: row.get("is_bear_bar")?,
        is_high_63: row.get("is_high_63")?,
        is_high_252: row.get("is_high_252")?,
        is_low_63: row.get("is_low_63")?,
        is_low_252: row.get("is_low_252")?,
        buy_signal: row.get("buy_signal")?,
        sell_signal: row.get("sell_signal")?,
        signal: row.get("signal")?,
        signal_change: row.get("signal_change")?,
    })
}

// ============================================================================
// Tests
// ============================================================================
