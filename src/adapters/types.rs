//! Shared adapter plumbing: HTTP client, JSON GET helper and ticker batch
//! conversion.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::traits::RawTicker;
use crate::config::constants;
use crate::core::symbol::SymbolError;
use crate::core::types::TickerRecord;

// =============================================================================
// HTTP Client Constants
// =============================================================================

/// HTTP connection timeout (milliseconds), fail fast if host unreachable
const HTTP_CONNECT_TIMEOUT_MS: u64 = 1500;
/// Max idle connections per host in connection pool
const HTTP_POOL_MAX_IDLE: usize = 5;
/// How long idle connections stay in the pool (seconds)
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 60;
/// TCP keepalive interval (seconds)
const HTTP_TCP_KEEPALIVE_SECS: u64 = 30;
/// Max characters of an error body kept in `HttpStatus`
const ERROR_BODY_MAX_CHARS: usize = 512;

/// Create a pooled HTTP client for one exchange
pub fn create_http_client(exchange_name: &str) -> reqwest::Client {
    let timeout = constants::http_timeout();
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE)
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .tcp_keepalive(Duration::from_secs(HTTP_TCP_KEEPALIVE_SECS))
        .connect_timeout(Duration::from_millis(HTTP_CONNECT_TIMEOUT_MS))
        .tcp_nodelay(true)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
    tracing::info!(
        phase = "init",
        exchange = %exchange_name,
        timeout_ms = timeout.as_millis() as u64,
        connect_timeout_ms = HTTP_CONNECT_TIMEOUT_MS,
        pool_max_idle = HTTP_POOL_MAX_IDLE,
        "HTTP client configured"
    );
    client
}

/// GET `url` and decode a JSON body.
///
/// Non-2xx statuses become `HttpStatus` (with a truncated body), decode
/// failures become `InvalidResponse`.
pub async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> ExchangeResult<T> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ExchangeError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_MAX_CHARS).collect(),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        ExchangeError::InvalidResponse(format!("{}: {}", url, e))
    })
}

// =============================================================================
// Ticker Batch
// =============================================================================

/// Normalized result of one `fetch_tickers` call
#[derive(Debug, Clone, Default)]
pub struct TickerBatch {
    /// Successfully converted tickers
    pub tickers: Vec<TickerRecord>,
    /// Round-trip + parse time
    pub elapsed: Duration,
    /// Raw entries dropped for an unsupported quote currency
    pub unsupported: usize,
    /// Raw entries dropped for any other conversion failure
    pub rejected: usize,
}

/// Convert raw payloads, applying the drop/log policy:
/// unsupported quotes are silent, other failures are warned with context.
pub fn convert_batch<T: RawTicker>(exchange: &str, raw: &[T], started: Instant) -> TickerBatch {
    let mut batch = TickerBatch {
        tickers: Vec::with_capacity(raw.len()),
        ..Default::default()
    };

    for item in raw {
        match item.to_ticker_record() {
            Ok(ticker) => batch.tickers.push(ticker),
            Err(ExchangeError::Symbol(SymbolError::UnsupportedQuoteCurrency(_))) => {
                batch.unsupported += 1;
            }
            Err(e) => {
                batch.rejected += 1;
                warn!(
                    exchange = %exchange,
                    symbol = %item.exchange_symbol(),
                    error = %e,
                    "Failed to convert ticker, dropping"
                );
            }
        }
    }

    batch.elapsed = started.elapsed();
    debug!(
        exchange = %exchange,
        converted = batch.tickers.len(),
        unsupported = batch.unsupported,
        rejected = batch.rejected,
        "Ticker batch converted"
    );
    batch
}

/// Decode raw JSON entries one by one, then convert them like `convert_batch`.
///
/// An entry that doesn't match `T` (missing field, null price, wrong type) is
/// dropped, counted in `rejected` and warned with its symbol; the rest of the
/// list is unaffected.
pub fn decode_batch<T>(exchange: &str, raw: &[Value], started: Instant) -> TickerBatch
where
    T: RawTicker + DeserializeOwned,
{
    let mut decoded: Vec<T> = Vec::with_capacity(raw.len());
    let mut malformed = 0usize;

    for value in raw {
        match T::deserialize(value) {
            Ok(ticker) => decoded.push(ticker),
            Err(e) => {
                malformed += 1;
                warn!(
                    exchange = %exchange,
                    symbol = %value.get("symbol").and_then(serde_json::Value::as_str).unwrap_or("<missing>"),
                    error = %e,
                    "Malformed ticker entry, dropping"
                );
            }
        }
    }

    let mut batch = convert_batch(exchange, &decoded, started);
    batch.rejected += malformed;
    batch
}

/// Parse a decimal string field, mapping failures to `InvalidResponse`
pub fn parse_decimal(field: &str, value: &str) -> ExchangeResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| ExchangeError::InvalidResponse(format!("Invalid {} '{}': {}", field, value, e)))
}
