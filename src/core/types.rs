//! Core data types for the spread pipeline.
//!
//! Adapters produce `TickerRecord`s and `FundingRateRecord`s; the spread
//! engine consumes them and emits `Spread` opportunities.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::symbol::UnifiedSymbol;

// =============================================================================
// Ticker Record (best bid/ask from one exchange)
// =============================================================================

/// Normalized book ticker produced by an exchange adapter for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    /// Native exchange symbol (e.g. "BTCUSDT", "BTC_USDT")
    pub exchange_symbol: String,
    /// Canonical symbol (e.g. "BTC/USDT:PERP")
    pub unified_symbol: UnifiedSymbol,
    /// Best bid price
    pub bid: f64,
    /// Best ask price
    pub ask: f64,
    /// 24h traded volume in USD (nominal when the venue doesn't report it)
    pub volume_usd: f64,
}

// =============================================================================
// Funding Rate Record
// =============================================================================

/// Funding rate of one perpetual on one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingRateRecord {
    /// Fractional rate per funding interval (0.0001 = 0.01%)
    pub rate: f64,
    /// Hours between settlements
    #[serde(rename = "interval")]
    pub interval_hours: u32,
    /// Next settlement, epoch milliseconds
    #[serde(rename = "next_settle_time")]
    pub next_settle_time_ms: i64,
}

impl FundingRateRecord {
    /// Funding PnL of one side normalized to an 8-hour window, as a fraction.
    ///
    /// `side` is +1 for the short leg and -1 for the long leg. Returns `None`
    /// when the interval is unknown (0).
    #[inline]
    pub fn pnl_8h(&self, side: f64) -> Option<f64> {
        if self.interval_hours == 0 {
            return None;
        }
        Some(side * self.rate * (8.0 / f64::from(self.interval_hours)))
    }

    /// Next settlement as a UTC timestamp, if representable
    pub fn next_settle_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.next_settle_time_ms).single()
    }
}

// =============================================================================
// Spread (arbitrage opportunity)
// =============================================================================

/// Cross-exchange opportunity: sell on `exchange_short`, buy on `exchange_long`.
///
/// Funding fields use omit-if-absent serialization so that "no data" is
/// distinguishable from "zero carry".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub unified_symbol: UnifiedSymbol,
    /// Venue to sell on (higher bid)
    pub exchange_short: Arc<str>,
    /// Venue to buy on (lower ask)
    pub exchange_long: Arc<str>,
    /// (bid_short - ask_long) / mid * 100, positive for every emitted spread
    pub entry_spread_pct: f64,
    /// bid_short - ask_long
    pub open_diff: f64,
    /// (bid_long - ask_short) / mid * 100, signed
    pub exit_spread_pct: f64,
    /// bid_long - ask_short
    pub exit_diff: f64,
    /// Net funding carry over one 8h window, percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_spread_8h_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_info_short: Option<FundingRateRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_info_long: Option<FundingRateRecord>,
}

// =============================================================================
// Utility
// =============================================================================

/// Get current time in milliseconds since epoch.
#[inline]
pub fn current_time_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
