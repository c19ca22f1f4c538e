//! Adapter factory for dynamic exchange selection
//!
//! Creates `ExchangeAdapter` instances from the configured `ExchangeId`s.
//! Uses an enum-based dispatch pattern (no `Box<dyn>`) to preserve monomorphization.

use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::binance::BinanceAdapter;
use crate::adapters::errors::ExchangeResult;
use crate::adapters::mexc::{FundingSource, MexcAdapter, MexcFundingFeed};
use crate::adapters::traits::ExchangeAdapter;
use crate::adapters::types::TickerBatch;
use crate::config::{AppConfig, ExchangeId};
use crate::core::funding::FundingRateCache;
use crate::core::symbol::{SymbolResult, UnifiedSymbol};

// =============================================================================
// AnyAdapter: enum-based dispatch for dynamic exchange selection
// =============================================================================

/// Enum wrapping all concrete adapter types for runtime dispatch.
pub enum AnyAdapter {
    Binance(BinanceAdapter),
    Mexc(MexcAdapter),
}

/// Macro to reduce boilerplate for delegating trait methods
macro_rules! delegate {
    ($self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            AnyAdapter::Binance(a) => a.$method($($arg),*),
            AnyAdapter::Mexc(a) => a.$method($($arg),*),
        }
    };
    (await $self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            AnyAdapter::Binance(a) => a.$method($($arg),*).await,
            AnyAdapter::Mexc(a) => a.$method($($arg),*).await,
        }
    };
}

impl AnyAdapter {
    /// Long-lived push feed, when this adapter's funding comes from one.
    ///
    /// `None` means funding is refreshed by polling `refresh_funding_rates`.
    pub fn funding_feed(&self) -> Option<MexcFundingFeed> {
        match self {
            AnyAdapter::Mexc(a) if a.config().funding_source == FundingSource::Websocket => {
                Some(a.funding_feed())
            }
            _ => None,
        }
    }
}

#[async_trait]
impl ExchangeAdapter for AnyAdapter {
    fn name(&self) -> &'static str {
        delegate!(self, name())
    }

    fn unwrap_symbol(&self, exchange_symbol: &str) -> SymbolResult<UnifiedSymbol> {
        delegate!(self, unwrap_symbol(exchange_symbol))
    }

    fn wrap_symbol(&self, unified: &str) -> SymbolResult<String> {
        delegate!(self, wrap_symbol(unified))
    }

    async fn fetch_tickers(&self) -> ExchangeResult<TickerBatch> {
        delegate!(await self, fetch_tickers())
    }

    async fn refresh_funding_rates(&self) -> ExchangeResult<Duration> {
        delegate!(await self, refresh_funding_rates())
    }

    fn funding_cache(&self) -> &FundingRateCache {
        delegate!(self, funding_cache())
    }
}

// =============================================================================
// Factory Functions
// =============================================================================

/// Create an adapter for `id` using the per-exchange section of `config`.
pub fn create_adapter(id: ExchangeId, config: &AppConfig) -> AnyAdapter {
    match id {
        ExchangeId::Binance => AnyAdapter::Binance(BinanceAdapter::new(config.binance_config())),
        ExchangeId::Mexc => AnyAdapter::Mexc(MexcAdapter::new(config.mexc_config())),
    }
}
