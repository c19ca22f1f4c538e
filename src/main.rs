//! Perpetual futures spread scanner - entry point
//!
//! 1. Loads `.env` and configuration
//! 2. Builds the configured exchange adapters
//! 3. Warm-starts funding caches and starts funding refresh tasks
//! 4. Polls tickers and reports ranked spreads until Ctrl+C

use std::path::Path;

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use perp_spread_scanner::adapters::ExchangeManager;
use perp_spread_scanner::config::{self, constants, OutputMode};
use perp_spread_scanner::core::{run_polling_loop, JsonLinesSink, LogSink, ResultSink, Scanner, SpreadEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenvy::dotenv().ok();

    config::init_logging();
    info!("Spread scanner starting");
    constants::log_configuration();

    let config_path = constants::config_path();
    let config = config::load_config_or_default(Path::new(&config_path))
        .with_context(|| format!("loading configuration from {}", config_path))?;

    info!(
        exchanges = ?config.exchanges,
        poll_interval_secs = config.poll_interval_secs,
        spread_threshold_pct = ?config.spread_threshold_pct,
        cycle_timeout_ms = config.cycle_timeout_ms,
        funding_refresh_secs = config.funding_refresh_secs,
        mexc_funding_source = ?config.mexc.funding_source,
        funding_snapshot_dir = ?config.funding_snapshot.dir,
        output = ?config.output,
        "[CONFIG] Loaded"
    );

    let manager = ExchangeManager::from_config(&config);
    let warm = manager.warm_start_funding();
    if warm > 0 {
        info!(records = warm, "[FUNDING] Warm start complete");
    }
    let scanner = Scanner::new(
        manager,
        SpreadEngine::with_config(config.engine_config()),
        config.cycle_timeout(),
    );

    let shutdown = CancellationToken::new();

    // Spawn SIGINT handler task
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("[SHUTDOWN] Graceful shutdown initiated");
                shutdown_signal.cancel();
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for Ctrl+C signal");
            }
        }
    });

    let mut funding_tasks = scanner
        .manager()
        .spawn_funding_tasks(config.funding_refresh_interval(), &shutdown);

    let mut sink: Box<dyn ResultSink> = match config.output {
        OutputMode::Log => Box::new(LogSink::new(config.log_top_n)),
        OutputMode::JsonLines => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    let cycles = run_polling_loop(&scanner, config.poll_interval(), sink.as_mut(), shutdown.clone()).await;

    shutdown.cancel();
    while funding_tasks.join_next().await.is_some() {}

    info!(cycles, "[SHUTDOWN] Clean exit");
    Ok(())
}
