//! Binance Types
//!
//! REST response payloads for the USDⓈ-M futures API.
//!
//! Docs: https://developers.binance.com/docs/derivatives/usds-margined-futures/market-data/rest-api
//!
//! Prices and rates are decimal strings; times are epoch milliseconds.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::adapters::errors::ExchangeResult;
use crate::adapters::traits::RawTicker;
use crate::adapters::types::parse_decimal;
use crate::core::symbol::{unwrap_with_suffix, SymbolResult, UnifiedSymbol};
use crate::core::types::{FundingRateRecord, TickerRecord};

use super::config::DEFAULT_FUNDING_INTERVAL_HOURS;

/// Native quote suffix (`BTCUSDT`)
pub const SYMBOL_SUFFIX: &str = "USDT";

/// The book ticker endpoint carries no volume, record a fixed nominal value
pub const NOMINAL_VOLUME_USD: f64 = 1_000_000.0;

/// `BTCUSDT` → `BTC/USDT:PERP`
pub fn unwrap_binance_symbol(symbol: &str) -> SymbolResult<UnifiedSymbol> {
    unwrap_with_suffix(symbol, SYMBOL_SUFFIX)
}

// =============================================================================
// Book Ticker
// =============================================================================

/// `GET /fapi/v1/ticker/bookTicker` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceBookTicker {
    pub symbol: String,
    pub bid_price: String,
    pub ask_price: String,
}

impl RawTicker for BinanceBookTicker {
    fn exchange_symbol(&self) -> &str {
        &self.symbol
    }

    fn to_ticker_record(&self) -> ExchangeResult<TickerRecord> {
        let unified_symbol = unwrap_binance_symbol(&self.symbol)?;
        let bid = parse_decimal("bid price", &self.bid_price)?;
        let ask = parse_decimal("ask price", &self.ask_price)?;

        Ok(TickerRecord {
            exchange_symbol: self.symbol.clone(),
            unified_symbol,
            bid,
            ask,
            volume_usd: NOMINAL_VOLUME_USD,
        })
    }
}

// =============================================================================
// Funding
// =============================================================================

/// `GET /fapi/v1/premiumIndex` entry (fields we use)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinancePremiumIndex {
    pub symbol: String,
    /// Last settled funding rate, decimal string
    pub last_funding_rate: String,
    pub next_funding_time: i64,
}

/// `GET /fapi/v1/fundingInfo` entry. Only symbols with a non-default
/// interval or cap are listed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceFundingInfo {
    pub symbol: String,
    pub funding_interval_hours: u32,
}

/// Join premium index and funding info into unified funding records.
///
/// Non-USDT symbols are skipped silently, unparseable rates with a warning.
/// Symbols missing from `infos` get the default 8h interval.
pub fn merge_funding(
    premium: &[BinancePremiumIndex],
    infos: &[BinanceFundingInfo],
) -> HashMap<UnifiedSymbol, FundingRateRecord> {
    let intervals: HashMap<&str, u32> = infos
        .iter()
        .map(|info| (info.symbol.as_str(), info.funding_interval_hours))
        .collect();

    let mut merged = HashMap::with_capacity(premium.len());
    for entry in premium {
        let Ok(symbol) = unwrap_binance_symbol(&entry.symbol) else {
            continue;
        };
        let rate = match parse_decimal("funding rate", &entry.last_funding_rate) {
            Ok(rate) => rate,
            Err(e) => {
                warn!(
                    exchange = "binance",
                    symbol = %entry.symbol,
                    rate = %entry.last_funding_rate,
                    error = %e,
                    "Failed to parse funding rate"
                );
                continue;
            }
        };

        let interval_hours = intervals
            .get(entry.symbol.as_str())
            .copied()
            .unwrap_or(DEFAULT_FUNDING_INTERVAL_HOURS);

        merged.insert(
            symbol,
            FundingRateRecord {
                rate,
                interval_hours,
                next_settle_time_ms: entry.next_funding_time,
            },
        );
    }
    merged
}
