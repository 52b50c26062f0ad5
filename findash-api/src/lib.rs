//! Findash API Library
//!
//! Read-only stock screening over the `stock_data_daily` table of daily bars
//! and precomputed indicators.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  findash-api (Rust Service)                  │
//! │                            :8080                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  routes ──▶ screen::criteria ──▶ ScreenEngine ──▶ BarStore   │
//! │                                   │  ranker      ├ SQLite    │
//! │                                   └  price_delta └ Memory    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Screens
//!
//! - **New highs / new lows** over 63 or 252 trading days
//! - **Gap up / gap down**
//! - **Swing high / swing low crosses**, up or down
//! - **New buy / sell signals**
//! - **52-week relative strength highs**
//!
//! Every screen is served in identity shape (`{symbol, type}`) and in priced
//! shape, which adds the move from the previous trading day's close.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod engine;
pub mod error;
pub mod models;
pub mod routes;
pub mod screen;
pub mod store;

use anyhow::Result;
use findash_common::config::Config;
use std::net::SocketAddr;
use std::sync::Arc;

pub use engine::{ScreenEngine, ScreenOutput};
pub use error::ScreenError;
pub use routes::build_router;
pub use store::{BarStore, MemoryBarStore, SqliteBarStore, StoreError};

/// Screening service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Screening engine over the configured bar store
    pub engine: ScreenEngine,
}

impl ScreenerState {
    /// Open the configured bar store and build the engine.
    ///
    /// With `storage.preload_snapshot` the whole table is read once into an
    /// in-memory snapshot and the SQLite connection is released.
    pub async fn open(config: Config) -> Result<Self> {
        let sqlite = SqliteBarStore::open(&config.storage.database_path)?;

        let store: Arc<dyn BarStore> = if config.storage.preload_snapshot {
            Arc::new(sqlite.load_snapshot().await?)
        } else {
            Arc::new(sqlite)
        };

        Ok(Self::with_store(config, store))
    }

    /// Build state over an existing store.
    pub fn with_store(config: Config, store: Arc<dyn BarStore>) -> Self {
        let engine = ScreenEngine::new(
            store,
            config.screener.reference_symbol.clone(),
            config.screener.default_history_days,
        );
        tracing::info!(
            backend = engine.backend(),
            reference_symbol = %config.screener.reference_symbol,
            "Screening engine ready"
        );

        Self { config, engine }
    }
}

/// Main screening service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screening service
    pub async fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScreenerState::open(config).await?);
        Ok(Self { state })
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.listen_address().parse()?;
        let app = build_router(Arc::clone(&self.state));

        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
