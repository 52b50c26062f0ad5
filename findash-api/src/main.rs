//! Findash API - Stock screening service over daily bars.
//!
//! Serves new-high/new-low, gap, swing-cross, signal and relative-strength
//! screens plus price history from the `stock_data_daily` table.

use anyhow::Result;
use findash_api::ScreenerService;
use findash_common::config::Config;
use findash_common::logging::init_logging_with_exclusions;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // Load configuration with FINDASH_* overrides, then validate
    let config = Config::load_and_validate()?;

    // Initialize logging
    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Findash API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        database = %config.storage.database_path.display(),
        preload = config.storage.preload_snapshot,
        "Opening bar store"
    );

    let service = ScreenerService::new(config).await?;

    // Log startup timing before entering main service loop
    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
