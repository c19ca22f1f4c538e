//! Exchange adapters for Binance and MEXC perpetual futures
//!
//! This module provides the core abstractions for polling exchanges over
//! REST (and, for MEXC funding, WebSocket) and normalizing their payloads.

pub mod binance;
pub mod errors;
pub mod factory;
pub mod manager;
pub mod mexc;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use errors::{ExchangeError, ExchangeResult};
pub use types::{
    convert_batch, create_http_client, decode_batch, get_json, parse_decimal, TickerBatch,
};
pub use traits::{ExchangeAdapter, RawTicker};
pub use binance::{BinanceAdapter, BinanceConfig};
pub use mexc::{FundingSource, MexcAdapter, MexcConfig, MexcFundingFeed};
pub use factory::{create_adapter, AnyAdapter};
pub use manager::{CollectedPrices, ExchangeFailure, ExchangeFetch, ExchangeManager};
