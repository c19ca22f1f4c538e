//! Exchange adapter trait definition
//!
//! The ExchangeAdapter trait defines the common interface that all
//! exchange adapters must implement. Adapters are pure collaborators of the
//! spread engine: they poll, parse and normalize, and never see the engine.

use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::errors::ExchangeResult;
use crate::adapters::types::TickerBatch;
use crate::core::funding::FundingRateCache;
use crate::core::symbol::{SymbolResult, UnifiedSymbol};
use crate::core::types::TickerRecord;

/// Raw ticker payload as decoded from an exchange response.
pub trait RawTicker {
    /// Native symbol, used for diagnostics when conversion fails
    fn exchange_symbol(&self) -> &str;

    /// Normalize into a `TickerRecord`.
    ///
    /// `ExchangeError::Symbol(UnsupportedQuoteCurrency)` is the expected,
    /// ignorable failure; anything else is a real parse problem.
    fn to_ticker_record(&self) -> ExchangeResult<TickerRecord>;
}

/// Common trait for all exchange adapters
///
/// # Example Implementation
///
/// ```ignore
/// use async_trait::async_trait;
///
/// struct BybitAdapter {
///     client: reqwest::Client,
///     funding: FundingRateCache,
/// }
///
/// #[async_trait]
/// impl ExchangeAdapter for BybitAdapter {
///     fn name(&self) -> &'static str { "bybit" }
///     async fn fetch_tickers(&self) -> ExchangeResult<TickerBatch> {
///         // GET /v5/market/tickers, then convert_batch(...)
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Exchange identifier used as the price table key (e.g. "binance")
    fn name(&self) -> &'static str;

    /// Native symbol → unified symbol.
    ///
    /// Fails with `UnsupportedQuoteCurrency` for non-USDT instruments.
    fn unwrap_symbol(&self, exchange_symbol: &str) -> SymbolResult<UnifiedSymbol>;

    /// Unified symbol string → native symbol.
    ///
    /// Fails with `InvalidUnifiedSymbolFormat` unless the input is exactly
    /// `BASE/QUOTE:PERP`.
    fn wrap_symbol(&self, unified: &str) -> SymbolResult<String>;

    /// Fetch and normalize the full book-ticker list.
    ///
    /// Any error is terminal for this exchange's contribution to the current
    /// cycle only.
    async fn fetch_tickers(&self) -> ExchangeResult<TickerBatch>;

    /// Refresh the funding cache from the exchange.
    ///
    /// Returns the elapsed time. The cache is left untouched on failure.
    async fn refresh_funding_rates(&self) -> ExchangeResult<Duration>;

    /// Funding cache owned by this adapter
    fn funding_cache(&self) -> &FundingRateCache;
}
