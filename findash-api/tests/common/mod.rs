//! Shared fixtures: a seeded SQLite bar table behind the real router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Local, NaiveDate};
use findash_api::{build_router, ScreenerState, SqliteBarStore};
use findash_common::config::Config;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SCREEN_DATE: &str = "2024-05-06";
pub const PREVIOUS_DATE: &str = "2024-05-02";

/// One seeded row; unset flags are stored as 0.
pub struct Row<'a> {
    pub symbol: &'a str,
    pub kind: &'a str,
    pub date: String,
    pub close: f64,
    pub rs: Option<f64>,
    pub flags: &'a [&'a str],
    pub signal: i64,
}

impl<'a> Row<'a> {
    pub fn new(symbol: &'a str, date: &str, close: f64) -> Self {
        Self {
            symbol,
            kind: "stock",
            date: date.to_string(),
            close,
            rs: None,
            flags: &[],
            signal: 0,
        }
    }

    pub fn rs(mut self, rs: f64) -> Self {
        self.rs = Some(rs);
        self
    }

    pub fn flags(mut self, flags: &'a [&'a str]) -> Self {
        self.flags = flags;
        self
    }

    pub fn signal(mut self, signal: i64) -> Self {
        self.signal = signal;
        self
    }

    pub fn kind(mut self, kind: &'a str) -> Self {
        self.kind = kind;
        self
    }
}

const FLAG_COLUMNS: &[&str] = &[
    "is_high_63",
    "is_high_252",
    "is_low_63",
    "is_low_252",
    "is_gap_up",
    "is_gap_down",
    "swing_high_cross_up",
    "swing_high_cross_down",
    "swing_low_cross_up",
    "swing_low_cross_down",
    "signal_change",
    "is_rs_52_week_high",
];

fn insert(conn: &Connection, row: &Row<'_>) {
    let mut columns = vec![
        "symbol", "name", "type", "interval", "date", "open", "high", "low", "close",
        "adjusted_close", "volume", "rs", "signal", "ema_21", "ema_200",
    ];
    columns.extend_from_slice(FLAG_COLUMNS);

    let flags: Vec<String> = FLAG_COLUMNS
        .iter()
        .map(|c| if row.flags.contains(c) { "1" } else { "0" }.to_string())
        .collect();

    let sql = format!(
        "INSERT INTO stock_data_daily ({}) VALUES (?1, ?2, ?3, '1day', ?4, ?5, ?5, ?5, ?5, ?5, 1000, ?6, ?7, ?5, NULL, {})",
        columns.join(", "),
        flags.join(", ")
    );
    conn.execute(
        &sql,
        params![row.symbol, row.symbol, row.kind, row.date, row.close, row.rs, row.signal],
    )
    .unwrap();
}

/// Bootstrap the schema through the store, then seed through a second
/// connection.
pub fn seed_database(path: &Path, rows: &[Row<'_>]) {
    drop(SqliteBarStore::open(path).unwrap());
    let conn = Connection::open(path).unwrap();
    for row in rows {
        insert(&conn, row);
    }
}

/// The screening fixture used by most tests.
pub fn default_rows() -> Vec<Row<'static>> {
    vec![
        // Reference symbol
        Row::new("SPY", PREVIOUS_DATE, 500.0),
        Row::new("SPY", SCREEN_DATE, 510.0).rs(50.0),
        // New highs on SCREEN_DATE
        Row::new("AAPL", PREVIOUS_DATE, 100.0),
        Row::new("AAPL", SCREEN_DATE, 110.0)
            .rs(90.0)
            .flags(&["is_high_252", "is_gap_up", "signal_change"])
            .signal(1),
        Row::new("MSFT", PREVIOUS_DATE, 0.0),
        Row::new("MSFT", SCREEN_DATE, 5.0)
            .rs(70.0)
            .flags(&["is_high_252", "is_rs_52_week_high"]),
        Row::new("NVDA", SCREEN_DATE, 20.0).flags(&["is_high_252", "is_high_63"]),
        Row::new("QQQ", SCREEN_DATE, 400.0)
            .kind("etf")
            .rs(70.0)
            .flags(&["is_high_252", "swing_high_cross_up"]),
        // Bearish names
        Row::new("TSLA", PREVIOUS_DATE, 200.0),
        Row::new("TSLA", SCREEN_DATE, 180.0)
            .rs(5.0)
            .flags(&["is_low_63", "is_gap_down", "signal_change", "swing_low_cross_down"])
            .signal(-1),
        Row::new("INTC", SCREEN_DATE, 30.0)
            .rs(15.0)
            .flags(&["is_low_63", "is_gap_down"]),
        Row::new("BA", SCREEN_DATE, 150.0).flags(&["is_low_63"]),
    ]
}

/// Daily bars for `symbol` covering the last `days` calendar days.
pub fn recent_rows(symbol: &'static str, days: i64) -> Vec<Row<'static>> {
    let today = Local::now().date_naive();
    (0..=days)
        .map(|offset| {
            let date: NaiveDate = today - Duration::days(offset);
            Row {
                date: date.format("%Y-%m-%d").to_string(),
                ..Row::new(symbol, "1970-01-01", 100.0 + offset as f64)
            }
        })
        .collect()
}

pub struct TestApp {
    pub router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new(rows: &[Row<'_>]) -> Self {
        Self::with_preload(rows, false).await
    }

    pub async fn with_preload(rows: &[Row<'_>], preload: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockdb.sqlite");
        seed_database(&path, rows);

        let mut config = Config::default();
        config.storage.database_path = path;
        config.storage.preload_snapshot = preload;

        let state = ScreenerState::open(config).await.unwrap();
        Self {
            router: build_router(Arc::new(state)),
            _dir: dir,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn get_raw(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }
}

pub fn symbols(json: &serde_json::Value) -> Vec<String> {
    json.as_array()
        .unwrap()
        .iter()
        .map(|row| row["symbol"].as_str().unwrap().to_string())
        .collect()
}
