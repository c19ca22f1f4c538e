//! MEXC Types
//!
//! REST envelopes and WebSocket frames for the contract API.
//!
//! Docs: https://mexcdevelop.github.io/apidocs/contract_v1_en/
//!
//! Unlike Binance, prices and rates are JSON numbers.

use serde::{Deserialize, Serialize};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::traits::RawTicker;
use crate::core::symbol::{unwrap_with_suffix, SymbolResult, UnifiedSymbol};
use crate::core::types::{FundingRateRecord, TickerRecord};

/// Native quote suffix (`BTC_USDT`)
pub const SYMBOL_SUFFIX: &str = "_USDT";

/// `BTC_USDT` → `BTC/USDT:PERP`
pub fn unwrap_mexc_symbol(symbol: &str) -> SymbolResult<UnifiedSymbol> {
    unwrap_with_suffix(symbol, SYMBOL_SUFFIX)
}

// =============================================================================
// REST
// =============================================================================

/// Common `{success, code, data}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct MexcResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    pub data: Option<T>,
}

impl<T> MexcResponse<T> {
    /// Unwrap `data`, mapping `success: false` to `ApiRejected`
    pub fn into_data(self, url: &str) -> ExchangeResult<T> {
        if !self.success {
            return Err(ExchangeError::ApiRejected {
                url: url.to_string(),
                code: self.code,
            });
        }
        self.data
            .ok_or_else(|| ExchangeError::InvalidResponse(format!("{}: missing data", url)))
    }
}

/// `GET /api/v1/contract/ticker` entry
#[derive(Debug, Clone, Deserialize)]
pub struct MexcTicker {
    pub symbol: String,
    pub bid1: f64,
    pub ask1: f64,
    /// 24h turnover in quote currency
    #[serde(default)]
    pub amount24: f64,
}

impl RawTicker for MexcTicker {
    fn exchange_symbol(&self) -> &str {
        &self.symbol
    }

    fn to_ticker_record(&self) -> ExchangeResult<TickerRecord> {
        let unified_symbol = unwrap_mexc_symbol(&self.symbol)?;
        Ok(TickerRecord {
            exchange_symbol: self.symbol.clone(),
            unified_symbol,
            bid: self.bid1,
            ask: self.ask1,
            volume_usd: self.amount24,
        })
    }
}

/// `GET /api/v1/contract/detail` entry (fields we use)
#[derive(Debug, Clone, Deserialize)]
pub struct MexcContractDetail {
    pub symbol: String,
}

/// Funding payload, shared by `GET /api/v1/contract/funding_rate/{symbol}`
/// and `push.funding.rate`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MexcFundingRate {
    pub symbol: String,
    pub funding_rate: f64,
    /// Settlement cycle in hours
    #[serde(default)]
    pub collect_cycle: u32,
    #[serde(default)]
    pub next_settle_time: i64,
}

impl MexcFundingRate {
    pub fn to_record(&self) -> SymbolResult<(UnifiedSymbol, FundingRateRecord)> {
        let symbol = unwrap_mexc_symbol(&self.symbol)?;
        Ok((
            symbol,
            FundingRateRecord {
                rate: self.funding_rate,
                interval_hours: self.collect_cycle,
                next_settle_time_ms: self.next_settle_time,
            },
        ))
    }
}

// =============================================================================
// WebSocket
// =============================================================================

/// Outbound request frame
#[derive(Debug, Clone, Serialize)]
pub struct MexcWsRequest<'a> {
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<MexcWsSymbolParam<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MexcWsSymbolParam<'a> {
    pub symbol: &'a str,
}

impl<'a> MexcWsRequest<'a> {
    pub fn subscribe_funding(symbol: &'a str) -> Self {
        Self {
            method: "sub.funding.rate",
            param: Some(MexcWsSymbolParam { symbol }),
        }
    }

    pub fn ping() -> Self {
        Self {
            method: "ping",
            param: None,
        }
    }
}

/// Inbound frame; `data` is decoded per channel
#[derive(Debug, Clone, Deserialize)]
pub struct MexcWsFrame {
    pub channel: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub ts: i64,
}

/// Decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum MexcWsEvent {
    FundingRate(UnifiedSymbol, FundingRateRecord),
    /// Push for a non-USDT contract
    Unsupported(String),
    Error(String),
    SubscriptionAck,
    Pong,
    Unknown(String),
}

/// Decode one text frame
pub fn parse_ws_frame(text: &str) -> Result<MexcWsEvent, serde_json::Error> {
    let frame: MexcWsFrame = serde_json::from_str(text)?;
    let event = match frame.channel.as_str() {
        "push.funding.rate" => {
            let payload: MexcFundingRate = serde_json::from_value(frame.data)?;
            match payload.to_record() {
                Ok((symbol, record)) => MexcWsEvent::FundingRate(symbol, record),
                Err(_) => MexcWsEvent::Unsupported(payload.symbol),
            }
        }
        "rs.error" => match frame.data {
            serde_json::Value::String(message) => MexcWsEvent::Error(message),
            other => MexcWsEvent::Error(other.to_string()),
        },
        "rs.sub.funding.rate" => MexcWsEvent::SubscriptionAck,
        "pong" => MexcWsEvent::Pong,
        _ => MexcWsEvent::Unknown(frame.channel),
    };
    Ok(event)
}
