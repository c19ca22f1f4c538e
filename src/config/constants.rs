//! Application-wide constants and configuration defaults
//!
//! Values can be overridden via environment variables (a `.env` file is
//! loaded by `main` before any of these are read).

use std::time::Duration;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_CYCLE_TIMEOUT_MS: u64 = 4000;
pub const DEFAULT_FUNDING_REFRESH_SECS: u64 = 60;
pub const DEFAULT_LOG_TOP_N: usize = 5;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 3;

// =============================================================================
// Environment Overrides
// =============================================================================

/// Configuration file location (default: `config.yaml`)
///
/// Environment variable: `CONFIG_PATH`
pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Ticker poll interval override, if set and valid
///
/// Environment variable: `POLL_INTERVAL_SECS`
pub fn poll_interval_override() -> Option<u64> {
    std::env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Spread threshold override (percent), if set and valid
///
/// Environment variable: `SPREAD_THRESHOLD_PCT`
pub fn spread_threshold_override() -> Option<f64> {
    std::env::var("SPREAD_THRESHOLD_PCT")
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Per-request HTTP timeout (default: 3 seconds)
///
/// Environment variable: `HTTP_TIMEOUT_SECS`
pub fn http_timeout() -> Duration {
    let secs = std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Log environment-derived values (startup)
pub fn log_configuration() {
    tracing::info!(
        config_path = %config_path(),
        http_timeout_ms = http_timeout().as_millis() as u64,
        poll_interval_override = ?poll_interval_override(),
        spread_threshold_override = ?spread_threshold_override(),
        "Environment configuration"
    );
}
