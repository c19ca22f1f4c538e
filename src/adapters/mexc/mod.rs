//! MEXC contract futures adapter
//!
//! Public REST tickers, plus funding rates from either chunked REST polling
//! or the `sub.funding.rate` WebSocket feed.

mod adapter;
mod config;
pub mod types;
mod websocket;

pub use adapter::{wrap_mexc_symbol, MexcAdapter};
pub use config::{FundingSource, MexcConfig};
pub use websocket::MexcFundingFeed;
