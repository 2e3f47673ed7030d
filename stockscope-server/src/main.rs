//! StockScope - A-share turnover statistics and financial screening service.
//!
//! Serves price history with log-turnover statistics, company snapshots,
//! per-stock annual performance and a multi-year fundamental screen.

use anyhow::Result;
use stockscope_common::config::{Config, ConfigSource};
use stockscope_common::logging::init_logging;
use stockscope_server::StockScopeService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    // Load and validate configuration
    let (config, source) = Config::load_and_validate()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("StockScope v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File(path) => tracing::info!(path = %path.display(), "Loaded config file"),
        ConfigSource::Defaults(path) => {
            tracing::info!(path = %path.display(), "Config file not found, using defaults")
        }
    }

    let service = StockScopeService::new(config)?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
