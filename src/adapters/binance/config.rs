//! Binance Configuration
//!
//! Endpoints for the USDⓈ-M futures public REST API.

// =============================================================================
// Constants
// =============================================================================

/// Production futures REST base URL
const MAINNET_BASE_URL: &str = "https://fapi.binance.com";

pub(crate) const BOOK_TICKER_PATH: &str = "/fapi/v1/ticker/bookTicker";
pub(crate) const PREMIUM_INDEX_PATH: &str = "/fapi/v1/premiumIndex";
pub(crate) const FUNDING_INFO_PATH: &str = "/fapi/v1/fundingInfo";

/// Interval assumed when `fundingInfo` has no entry for a symbol
pub(crate) const DEFAULT_FUNDING_INTERVAL_HOURS: u32 = 8;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Binance adapter (public market data)
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// REST base URL, overridable for tests
    pub base_url: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: MAINNET_BASE_URL.to_string(),
        }
    }
}

impl BinanceConfig {
    /// Create configuration with an optional base URL override
    pub fn with_base_url(base_url: Option<&str>) -> Self {
        match base_url {
            Some(url) => Self {
                base_url: url.trim_end_matches('/').to_string(),
            },
            None => Self::default(),
        }
    }

    pub fn book_ticker_url(&self) -> String {
        format!("{}{}", self.base_url, BOOK_TICKER_PATH)
    }

    pub fn premium_index_url(&self) -> String {
        format!("{}{}", self.base_url, PREMIUM_INDEX_PATH)
    }

    pub fn funding_info_url(&self) -> String {
        format!("{}{}", self.base_url, FUNDING_INFO_PATH)
    }
}
