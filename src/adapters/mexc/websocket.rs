//! MEXC funding rate push feed
//!
//! Symbols are split across connections of `ws_subscriptions_per_connection`.
//! Each connection subscribes to `sub.funding.rate` per symbol, pings on
//! `ws_ping_interval` and upserts every push into the shared cache.
//!
//! The whole feed is torn down and rebuilt every `restart_interval` through a
//! per-generation child `CancellationToken`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::core::funding::FundingRateCache;

use super::adapter::{fetch_contract_symbols, wrap_all, EXCHANGE_NAME};
use super::config::MexcConfig;
use super::types::{parse_ws_frame, MexcWsEvent, MexcWsRequest};

/// Wait before retrying when the symbol list can't be fetched
const SYMBOL_RETRY_DELAY_SECS: u64 = 10;

/// Long-lived funding feed writing into an adapter's cache
pub struct MexcFundingFeed {
    config: MexcConfig,
    http_client: reqwest::Client,
    cache: Arc<FundingRateCache>,
}

impl MexcFundingFeed {
    pub fn new(config: MexcConfig, http_client: reqwest::Client, cache: Arc<FundingRateCache>) -> Self {
        Self {
            config,
            http_client,
            cache,
        }
    }

    /// Run until `shutdown` is cancelled, rebuilding on `restart_interval`.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut generation_id: u64 = 0;

        loop {
            let natives = match fetch_contract_symbols(&self.http_client, &self.config).await {
                Ok(symbols) => wrap_all(&symbols),
                Err(e) => {
                    warn!(exchange = EXCHANGE_NAME, error = %e, "Failed to list contracts for funding feed");
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(Duration::from_secs(SYMBOL_RETRY_DELAY_SECS)) => continue,
                    }
                }
            };

            if generation_id > 0 && self.config.invalidate_on_restart {
                self.cache.invalidate();
                debug!(exchange = EXCHANGE_NAME, "Funding cache invalidated on feed restart");
            }
            generation_id += 1;

            let generation = shutdown.child_token();
            let mut connections = self.spawn_connections(&natives, &generation);
            info!(
                exchange = EXCHANGE_NAME,
                generation = generation_id,
                symbols = natives.len(),
                connections = connections.len(),
                "Funding feed started"
            );

            let stop = tokio::select! {
                _ = shutdown.cancelled() => true,
                _ = tokio::time::sleep(self.config.restart_interval) => false,
            };

            generation.cancel();
            while connections.join_next().await.is_some() {}

            if stop {
                info!(exchange = EXCHANGE_NAME, "Funding feed stopped");
                return;
            }
            info!(exchange = EXCHANGE_NAME, generation = generation_id, "Funding feed restarting");
        }
    }

    fn spawn_connections(&self, natives: &[String], generation: &CancellationToken) -> JoinSet<()> {
        let per_connection = self.config.ws_subscriptions_per_connection.max(1);
        let mut connections = JoinSet::new();

        for (index, chunk) in natives.chunks(per_connection).enumerate() {
            let url = self.config.ws_url.clone();
            let symbols = chunk.to_vec();
            let ping_every = self.config.ws_ping_interval;
            let cache = Arc::clone(&self.cache);
            let token = generation.clone();

            connections.spawn(async move {
                if let Err(e) = run_connection(&url, &symbols, ping_every, &cache, token).await {
                    error!(
                        exchange = EXCHANGE_NAME,
                        connection = index,
                        error = %e,
                        "Funding WebSocket connection ended with error"
                    );
                }
            });
        }
        connections
    }
}

/// One connection: subscribe, ping, apply pushes until cancelled or closed.
async fn run_connection(
    url: &str,
    symbols: &[String],
    ping_every: Duration,
    cache: &FundingRateCache,
    cancel: CancellationToken,
) -> ExchangeResult<()> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut sender, mut receiver) = ws_stream.split();
    info!(exchange = EXCHANGE_NAME, subscribed_symbols = symbols.len(), "Funding WebSocket connected");

    for symbol in symbols {
        let frame = serde_json::to_string(&MexcWsRequest::subscribe_funding(symbol))
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))?;
        sender.send(Message::Text(frame)).await?;
    }

    let ping_frame = serde_json::to_string(&MexcWsRequest::ping())
        .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))?;
    let mut ping = interval(ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ping.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                return Ok(());
            }
            _ = ping.tick() => {
                sender.send(Message::Text(ping_frame.clone())).await?;
                trace!(exchange = EXCHANGE_NAME, "Ping sent");
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => apply_frame(&text, cache),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => apply_frame(&text, cache),
                    Err(e) => warn!(exchange = EXCHANGE_NAME, error = %e, "Non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!(exchange = EXCHANGE_NAME, frame = ?frame, "Funding WebSocket closed by server");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}

/// Decode one text frame and apply it to the cache.
pub(super) fn apply_frame(text: &str, cache: &FundingRateCache) {
    match parse_ws_frame(text) {
        Ok(MexcWsEvent::FundingRate(symbol, record)) => {
            trace!(exchange = EXCHANGE_NAME, symbol = %symbol, rate = record.rate, "Funding push");
            cache.upsert(symbol, record);
        }
        Ok(MexcWsEvent::Unsupported(_)) => {}
        Ok(MexcWsEvent::Error(message)) => {
            error!(exchange = EXCHANGE_NAME, error_message = %message, "Funding WebSocket error");
        }
        Ok(MexcWsEvent::SubscriptionAck) | Ok(MexcWsEvent::Pong) => {}
        Ok(MexcWsEvent::Unknown(channel)) => {
            warn!(exchange = EXCHANGE_NAME, channel = %channel, "Unknown WebSocket channel");
        }
        Err(e) => {
            warn!(exchange = EXCHANGE_NAME, error = %e, message = %text, "Failed to parse WebSocket frame");
        }
    }
}
