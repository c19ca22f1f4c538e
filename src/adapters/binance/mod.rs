//! Binance USDⓈ-M futures adapter
//!
//! Public REST market data only: book tickers and funding rates.

mod adapter;
mod config;
pub mod types;

pub use adapter::BinanceAdapter;
pub use config::BinanceConfig;
