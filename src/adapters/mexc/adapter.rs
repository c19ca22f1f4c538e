//! MEXC Adapter Implementation
//!
//! Tickers come from the public contract REST API. Funding rates come either
//! from chunked per-symbol REST calls (`refresh_funding_rates`) or from the
//! push feed in `websocket.rs`, depending on `MexcConfig::funding_source`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use crate::adapters::errors::ExchangeResult;
use crate::adapters::traits::ExchangeAdapter;
use crate::adapters::types::{create_http_client, decode_batch, get_json, TickerBatch};
use crate::core::funding::FundingRateCache;
use crate::core::symbol::{wrap_with_suffix, SymbolResult, UnifiedSymbol};
use crate::core::types::FundingRateRecord;

use super::config::MexcConfig;
use super::types::{
    unwrap_mexc_symbol, MexcContractDetail, MexcFundingRate, MexcResponse, MexcTicker,
    SYMBOL_SUFFIX,
};
use super::websocket::MexcFundingFeed;

pub(super) const EXCHANGE_NAME: &str = "mexc";

/// `BTC/USDT:PERP` → `BTC_USDT`
pub fn wrap_mexc_symbol(unified: &str) -> SymbolResult<String> {
    wrap_with_suffix(unified, SYMBOL_SUFFIX)
}

/// List USDT-margined contracts from `/api/v1/contract/detail`.
///
/// Non-USDT contracts are skipped.
pub(super) async fn fetch_contract_symbols(
    client: &reqwest::Client,
    config: &MexcConfig,
) -> ExchangeResult<Vec<UnifiedSymbol>> {
    let url = config.contract_detail_url();
    let response: MexcResponse<Vec<MexcContractDetail>> = get_json(client, &url).await?;
    let details = response.into_data(&url)?;

    let mut symbols: Vec<UnifiedSymbol> = details
        .iter()
        .filter_map(|detail| unwrap_mexc_symbol(&detail.symbol).ok())
        .collect();
    symbols.sort();
    symbols.dedup();

    debug!(
        exchange = EXCHANGE_NAME,
        contracts = details.len(),
        usdt_contracts = symbols.len(),
        "Contract list fetched"
    );
    Ok(symbols)
}

/// Convert unified symbols back to native ones, logging any that can't be.
pub(super) fn wrap_all(symbols: &[UnifiedSymbol]) -> Vec<String> {
    symbols
        .iter()
        .filter_map(|symbol| match wrap_mexc_symbol(symbol.as_str()) {
            Ok(native) => Some(native),
            Err(e) => {
                error!(exchange = EXCHANGE_NAME, symbol = %symbol, error = %e, "Failed to wrap symbol");
                None
            }
        })
        .collect()
}

// =============================================================================
// MEXC Adapter
// =============================================================================

/// MEXC contract futures adapter
pub struct MexcAdapter {
    config: MexcConfig,
    http_client: reqwest::Client,
    /// Shared with the WebSocket feed tasks
    funding: Arc<FundingRateCache>,
}

impl MexcAdapter {
    pub fn new(config: MexcConfig) -> Self {
        Self {
            http_client: create_http_client(EXCHANGE_NAME),
            config,
            funding: Arc::new(FundingRateCache::new()),
        }
    }

    pub fn config(&self) -> &MexcConfig {
        &self.config
    }

    /// Build the push feed that writes into this adapter's funding cache.
    pub fn funding_feed(&self) -> MexcFundingFeed {
        MexcFundingFeed::new(
            self.config.clone(),
            self.http_client.clone(),
            Arc::clone(&self.funding),
        )
    }

    async fn fetch_funding_rate(
        &self,
        native_symbol: &str,
    ) -> ExchangeResult<(UnifiedSymbol, FundingRateRecord)> {
        let url = self.config.funding_rate_url(native_symbol);
        let response: MexcResponse<MexcFundingRate> = get_json(&self.http_client, &url).await?;
        let payload = response.into_data(&url)?;
        Ok(payload.to_record()?)
    }
}

#[async_trait]
impl ExchangeAdapter for MexcAdapter {
    fn name(&self) -> &'static str {
        EXCHANGE_NAME
    }

    fn unwrap_symbol(&self, exchange_symbol: &str) -> SymbolResult<UnifiedSymbol> {
        unwrap_mexc_symbol(exchange_symbol)
    }

    fn wrap_symbol(&self, unified: &str) -> SymbolResult<String> {
        wrap_mexc_symbol(unified)
    }

    async fn fetch_tickers(&self) -> ExchangeResult<TickerBatch> {
        let started = Instant::now();
        let url = self.config.ticker_url();
        let response: MexcResponse<Vec<serde_json::Value>> =
            get_json(&self.http_client, &url).await?;
        let raw = response.into_data(&url)?;
        debug!(exchange = EXCHANGE_NAME, raw = raw.len(), "Tickers received");
        Ok(decode_batch::<MexcTicker>(EXCHANGE_NAME, &raw, started))
    }

    /// Chunked REST refresh: `funding_chunk_size` concurrent requests, then
    /// `funding_chunk_delay` before the next chunk. Per-symbol failures are
    /// logged and skipped; the collected map replaces the cache.
    async fn refresh_funding_rates(&self) -> ExchangeResult<Duration> {
        let started = Instant::now();
        let symbols = fetch_contract_symbols(&self.http_client, &self.config).await?;
        let native = wrap_all(&symbols);

        let chunk_size = self.config.funding_chunk_size.max(1);
        let chunk_count = native.len().div_ceil(chunk_size);
        let mut collected = HashMap::with_capacity(native.len());
        let mut failed = 0usize;

        for (index, chunk) in native.chunks(chunk_size).enumerate() {
            debug!(exchange = EXCHANGE_NAME, chunk = index, size = chunk.len(), "Fetching funding chunk");
            let results = join_all(chunk.iter().map(|s| self.fetch_funding_rate(s))).await;

            for (native_symbol, result) in chunk.iter().zip(results) {
                match result {
                    Ok((symbol, record)) => {
                        collected.insert(symbol, record);
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(
                            exchange = EXCHANGE_NAME,
                            symbol = %native_symbol,
                            error = %e,
                            "Failed to fetch funding rate"
                        );
                    }
                }
            }

            if index + 1 < chunk_count && !self.config.funding_chunk_delay.is_zero() {
                tokio::time::sleep(self.config.funding_chunk_delay).await;
            }
        }

        let count = collected.len();
        self.funding.replace_all(collected);

        let elapsed = started.elapsed();
        info!(
            exchange = EXCHANGE_NAME,
            symbols = count,
            failed,
            latency_ms = elapsed.as_millis() as u64,
            "Funding rates refreshed"
        );
        Ok(elapsed)
    }

    fn funding_cache(&self) -> &FundingRateCache {
        &self.funding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::errors::ExchangeError;
    use crate::core::symbol::SymbolError;

    fn adapter_for(server: &mockito::Server) -> MexcAdapter {
        let mut config = MexcConfig::with_base_url(Some(&server.url()));
        config.funding_chunk_size = 2;
        config.funding_chunk_delay = Duration::ZERO;
        MexcAdapter::new(config)
    }

    #[test]
    fn test_symbol_mapping() {
        let adapter = MexcAdapter::new(MexcConfig::default());
        assert_eq!(
            adapter.unwrap_symbol("BTC_USDT").unwrap().as_str(),
            "BTC/USDT:PERP"
        );
        assert_eq!(adapter.wrap_symbol("BTC/USDT:PERP").unwrap(), "BTC_USDT");
        assert!(matches!(
            adapter.unwrap_symbol("BTC_USD"),
            Err(SymbolError::UnsupportedQuoteCurrency(_))
        ));
        assert!(matches!(
            adapter.wrap_symbol("BTC/USDT"),
            Err(SymbolError::InvalidUnifiedSymbolFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_tickers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/contract/ticker")
            .with_status(200)
            .with_body(
                r#"{"success":true,"code":0,"data":[
                    {"symbol":"BTC_USDT","bid1":100.0,"ask1":100.5,"amount24":5000000.0},
                    {"symbol":"ETH_USDT","bid1":10.0,"ask1":10.1,"amount24":200000.0},
                    {"symbol":"BTC_USD","bid1":100.0,"ask1":100.5,"amount24":1.0}
                ]}"#,
            )
            .create_async()
            .await;

        let adapter = adapter_for(&server);
        let batch = adapter.fetch_tickers().await.unwrap();
        assert_eq!(batch.tickers.len(), 2);
        assert_eq!(batch.unsupported, 1);
        assert_eq!(batch.rejected, 0);
        assert_eq!(batch.tickers[0].volume_usd, 5_000_000.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_entry_does_not_drop_exchange() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/contract/ticker")
            .with_status(200)
            .with_body(
                r#"{"success":true,"code":0,"data":[
                    {"symbol":"ETH_USDT","bid1":null,"ask1":10.1,"amount24":1.0},
                    {"symbol":"SOL_USDT","ask1":20.1},
                    {"symbol":"XRP_USDT","bid1":"0.5","ask1":0.51},
                    {"symbol":"BTC_USDT","bid1":100.0,"ask1":100.5,"amount24":5000000.0}
                ]}"#,
            )
            .create_async()
            .await;

        let adapter = adapter_for(&server);
        let batch = adapter.fetch_tickers().await.unwrap();
        assert_eq!(batch.rejected, 3);
        assert_eq!(batch.tickers.len(), 1);
        assert_eq!(batch.tickers[0].unified_symbol.as_str(), "BTC/USDT:PERP");
        assert_eq!(batch.tickers[0].bid, 100.0);
    }

    #[tokio::test]
    async fn test_fetch_tickers_api_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/contract/ticker")
            .with_status(200)
            .with_body(r#"{"success":false,"code":510}"#)
            .create_async()
            .await;

        let adapter = adapter_for(&server);
        assert!(matches!(
            adapter.fetch_tickers().await,
            Err(ExchangeError::ApiRejected { code: 510, .. })
        ));
    }

    #[tokio::test]
    async fn test_refresh_funding_rates_chunked() {
        let mut server = mockito::Server::new_async().await;
        let _detail = server
            .mock("GET", "/api/v1/contract/detail")
            .with_status(200)
            .with_body(
                r#"{"success":true,"code":0,"data":[
                    {"symbol":"BTC_USDT"},{"symbol":"ETH_USDT"},{"symbol":"SOL_USDT"},{"symbol":"BTC_USD"}
                ]}"#,
            )
            .create_async()
            .await;
        let _btc = server
            .mock("GET", "/api/v1/contract/funding_rate/BTC_USDT")
            .with_status(200)
            .with_body(r#"{"success":true,"code":0,"data":{"symbol":"BTC_USDT","fundingRate":0.0001,"collectCycle":8,"nextSettleTime":1700000000000}}"#)
            .create_async()
            .await;
        let _eth = server
            .mock("GET", "/api/v1/contract/funding_rate/ETH_USDT")
            .with_status(200)
            .with_body(r#"{"success":true,"code":0,"data":{"symbol":"ETH_USDT","fundingRate":-0.0003,"collectCycle":4,"nextSettleTime":1700000000000}}"#)
            .create_async()
            .await;
        let _sol = server
            .mock("GET", "/api/v1/contract/funding_rate/SOL_USDT")
            .with_status(500)
            .create_async()
            .await;

        let adapter = adapter_for(&server);
        adapter.refresh_funding_rates().await.unwrap();

        let cache = adapter.funding_cache();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("BTC/USDT:PERP").unwrap().rate, 0.0001);
        assert_eq!(cache.get("ETH/USDT:PERP").unwrap().interval_hours, 4);
        assert!(cache.get("SOL/USDT:PERP").is_none());
    }

    #[tokio::test]
    async fn test_refresh_funding_rates_detail_failure() {
        let mut server = mockito::Server::new_async().await;
        let _detail = server
            .mock("GET", "/api/v1/contract/detail")
            .with_status(200)
            .with_body(r#"{"success":false,"code":9999}"#)
            .create_async()
            .await;

        let adapter = adapter_for(&server);
        assert!(matches!(
            adapter.refresh_funding_rates().await,
            Err(ExchangeError::ApiRejected { code: 9999, .. })
        ));
        assert!(adapter.funding_cache().last_refresh_ms().is_none());
    }

    #[test]
    fn test_wrap_all() {
        let symbols = vec![
            UnifiedSymbol::parse("BTC/USDT:PERP").unwrap(),
            UnifiedSymbol::parse("ETH/USDT:PERP").unwrap(),
        ];
        assert_eq!(wrap_all(&symbols), vec!["BTC_USDT", "ETH_USDT"]);
    }
}
