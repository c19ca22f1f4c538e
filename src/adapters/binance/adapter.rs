//! Binance Adapter Implementation
//!
//! Polls the public USDⓈ-M futures REST API. No authentication, no WebSocket.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adapters::errors::ExchangeResult;
use crate::adapters::traits::ExchangeAdapter;
use crate::adapters::types::{create_http_client, decode_batch, get_json, TickerBatch};
use crate::core::funding::FundingRateCache;
use crate::core::symbol::{wrap_with_suffix, SymbolResult, UnifiedSymbol};

use super::config::BinanceConfig;
use super::types::{
    merge_funding, unwrap_binance_symbol, BinanceBookTicker, BinanceFundingInfo,
    BinancePremiumIndex, SYMBOL_SUFFIX,
};

const EXCHANGE_NAME: &str = "binance";

// =============================================================================
// Binance Adapter
// =============================================================================

/// Binance USDⓈ-M futures adapter
pub struct BinanceAdapter {
    config: BinanceConfig,
    http_client: reqwest::Client,
    funding: FundingRateCache,
}

impl BinanceAdapter {
    pub fn new(config: BinanceConfig) -> Self {
        Self {
            http_client: create_http_client(EXCHANGE_NAME),
            config,
            funding: FundingRateCache::new(),
        }
    }

    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceAdapter {
    fn name(&self) -> &'static str {
        EXCHANGE_NAME
    }

    fn unwrap_symbol(&self, exchange_symbol: &str) -> SymbolResult<UnifiedSymbol> {
        unwrap_binance_symbol(exchange_symbol)
    }

    fn wrap_symbol(&self, unified: &str) -> SymbolResult<String> {
        wrap_with_suffix(unified, SYMBOL_SUFFIX)
    }

    async fn fetch_tickers(&self) -> ExchangeResult<TickerBatch> {
        let started = Instant::now();
        let url = self.config.book_ticker_url();
        let raw: Vec<serde_json::Value> = get_json(&self.http_client, &url).await?;
        debug!(exchange = EXCHANGE_NAME, raw = raw.len(), "Book tickers received");
        Ok(decode_batch::<BinanceBookTicker>(EXCHANGE_NAME, &raw, started))
    }

    async fn refresh_funding_rates(&self) -> ExchangeResult<Duration> {
        let started = Instant::now();
        let premium_url = self.config.premium_index_url();
        let info_url = self.config.funding_info_url();

        let (premium, infos) = tokio::join!(
            get_json::<Vec<BinancePremiumIndex>>(&self.http_client, &premium_url),
            get_json::<Vec<BinanceFundingInfo>>(&self.http_client, &info_url),
        );
        let merged = merge_funding(&premium?, &infos?);
        let count = merged.len();
        self.funding.replace_all(merged);

        let elapsed = started.elapsed();
        info!(
            exchange = EXCHANGE_NAME,
            symbols = count,
            latency_ms = elapsed.as_millis() as u64,
            "Funding rates refreshed"
        );
        Ok(elapsed)
    }

    fn funding_cache(&self) -> &FundingRateCache {
        &self.funding
    }
}
