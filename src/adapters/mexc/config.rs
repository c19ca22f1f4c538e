//! MEXC Configuration
//!
//! Contract (futures) REST endpoints, the funding WebSocket endpoint and the
//! funding refresh tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Production contract REST base URL
const MAINNET_BASE_URL: &str = "https://contract.mexc.com";
/// Production contract WebSocket URL
const MAINNET_WS_URL: &str = "wss://contract.mexc.com/edge";

pub(crate) const TICKER_PATH: &str = "/api/v1/contract/ticker";
pub(crate) const CONTRACT_DETAIL_PATH: &str = "/api/v1/contract/detail";
pub(crate) const FUNDING_RATE_PATH: &str = "/api/v1/contract/funding_rate";

pub const DEFAULT_RESTART_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_FUNDING_CHUNK_SIZE: usize = 10;
pub const DEFAULT_FUNDING_CHUNK_DELAY_MS: u64 = 2000;
pub const DEFAULT_WS_SUBSCRIPTIONS_PER_CONNECTION: usize = 20;
pub const DEFAULT_WS_PING_INTERVAL_SECS: u64 = 20;

// =============================================================================
// Funding Source
// =============================================================================

/// Where MEXC funding rates come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    /// Chunked per-symbol REST polling
    #[default]
    Http,
    /// `sub.funding.rate` push feed
    Websocket,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the MEXC adapter
#[derive(Debug, Clone)]
pub struct MexcConfig {
    /// REST base URL, overridable for tests
    pub base_url: String,
    /// WebSocket URL for the funding feed
    pub ws_url: String,
    pub funding_source: FundingSource,
    /// Symbols fetched concurrently per chunk (HTTP source)
    pub funding_chunk_size: usize,
    /// Pause between chunks (HTTP source)
    pub funding_chunk_delay: Duration,
    /// Symbols per WebSocket connection
    pub ws_subscriptions_per_connection: usize,
    pub ws_ping_interval: Duration,
    /// Feed teardown/rebuild period (WebSocket source)
    pub restart_interval: Duration,
    /// Clear the cache on every feed rebuild
    pub invalidate_on_restart: bool,
}

impl Default for MexcConfig {
    fn default() -> Self {
        Self {
            base_url: MAINNET_BASE_URL.to_string(),
            ws_url: MAINNET_WS_URL.to_string(),
            funding_source: FundingSource::default(),
            funding_chunk_size: DEFAULT_FUNDING_CHUNK_SIZE,
            funding_chunk_delay: Duration::from_millis(DEFAULT_FUNDING_CHUNK_DELAY_MS),
            ws_subscriptions_per_connection: DEFAULT_WS_SUBSCRIPTIONS_PER_CONNECTION,
            ws_ping_interval: Duration::from_secs(DEFAULT_WS_PING_INTERVAL_SECS),
            restart_interval: Duration::from_secs(DEFAULT_RESTART_INTERVAL_SECS),
            invalidate_on_restart: false,
        }
    }
}

impl MexcConfig {
    /// Default configuration with an optional REST base URL override
    pub fn with_base_url(base_url: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(url) = base_url {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        config
    }

    pub fn ticker_url(&self) -> String {
        format!("{}{}", self.base_url, TICKER_PATH)
    }

    pub fn contract_detail_url(&self) -> String {
        format!("{}{}", self.base_url, CONTRACT_DETAIL_PATH)
    }

    /// Per-symbol funding endpoint, `symbol` in native form (`BTC_USDT`)
    pub fn funding_rate_url(&self, symbol: &str) -> String {
        format!("{}{}/{}", self.base_url, FUNDING_RATE_PATH, symbol)
    }
}
