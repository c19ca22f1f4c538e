//! Perpetual futures spread scanner
//!
//! Polls book tickers from several exchanges, joins them per unified symbol
//! and ranks cross-exchange entry spreads, annotated with funding carry:
//! - Exchange adapters (Binance, MEXC) with symbol normalization
//! - Funding rate caches refreshed independently of ticker polling
//! - Spread engine over any number of exchanges

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;

pub use error::AppError;
