//! Exchange manager: orchestrates multiple exchange adapters.
//!
//! Each cycle spawns one Tokio task per adapter. Results come back through a
//! `JoinSet` and are merged into a fresh `PriceTable` by the calling task
//! alone, so the table never needs a lock.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::errors::ExchangeError;
use crate::adapters::factory::{create_adapter, AnyAdapter};
use crate::adapters::traits::ExchangeAdapter;
use crate::config::AppConfig;
use crate::core::funding::FundingRateTable;
use crate::core::price_table::PriceTable;
use crate::core::snapshot::{FundingSnapshotStore, WarmStart};

// =============================================================================
// Cycle Outcome
// =============================================================================

/// One exchange's successful contribution to a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeFetch {
    pub exchange: Arc<str>,
    pub tickers: usize,
    pub unsupported: usize,
    pub rejected: usize,
    pub elapsed_ms: u64,
}

/// One exchange skipped for a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeFailure {
    pub exchange: Arc<str>,
    pub reason: String,
}

/// Merged tickers plus per-exchange bookkeeping
#[derive(Debug, Default)]
pub struct CollectedPrices {
    pub table: PriceTable,
    /// Sorted by exchange name
    pub succeeded: Vec<ExchangeFetch>,
    /// Sorted by exchange name
    pub failed: Vec<ExchangeFailure>,
}

impl CollectedPrices {
    /// Record every expected exchange that neither succeeded nor failed.
    ///
    /// A fetch task that panicked or was cancelled loses its exchange name,
    /// so it is recovered here by elimination.
    fn mark_unreported(&mut self, expected: &[&'static str], reason: &str) {
        for name in expected {
            let reported = self.succeeded.iter().any(|s| &*s.exchange == *name)
                || self.failed.iter().any(|f| &*f.exchange == *name);
            if !reported {
                self.failed.push(ExchangeFailure {
                    exchange: Arc::from(*name),
                    reason: reason.to_string(),
                });
            }
        }
    }
}

// =============================================================================
// Exchange Manager
// =============================================================================

/// Registry of the configured adapters.
pub struct ExchangeManager {
    adapters: Vec<Arc<AnyAdapter>>,
    snapshots: Option<Arc<FundingSnapshotStore>>,
}

impl ExchangeManager {
    pub fn new(adapters: Vec<AnyAdapter>) -> Self {
        Self {
            adapters: adapters.into_iter().map(Arc::new).collect(),
            snapshots: None,
        }
    }

    /// Persist funding caches to `store` after every refresh.
    pub fn with_snapshot_store(mut self, store: FundingSnapshotStore) -> Self {
        self.snapshots = Some(Arc::new(store));
        self
    }

    /// Build one adapter per entry of `config.exchanges`.
    pub fn from_config(config: &AppConfig) -> Self {
        let adapters = config
            .exchanges
            .iter()
            .map(|id| create_adapter(*id, config))
            .collect();
        let manager = Self::new(adapters);
        match config.funding_snapshot_store() {
            Some(store) => manager.with_snapshot_store(store),
            None => manager,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Fetch every exchange concurrently and merge into a fresh table.
    ///
    /// Each fetch is bounded by `per_exchange_timeout`. A failed or timed-out
    /// exchange contributes nothing to this cycle; the others are unaffected.
    pub async fn collect_price_table(&self, per_exchange_timeout: Duration) -> CollectedPrices {
        let mut tasks = JoinSet::new();
        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            tasks.spawn(async move {
                let name = adapter.name();
                let result = timeout(per_exchange_timeout, adapter.fetch_tickers()).await;
                (name, result)
            });
        }

        let mut collected = CollectedPrices::default();
        let mut task_errors = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (name, result) = match joined {
                Ok(output) => output,
                Err(e) => {
                    error!(error = %e, "Ticker fetch task failed to complete");
                    task_errors.push(e.to_string());
                    continue;
                }
            };
            let exchange: Arc<str> = Arc::from(name);

            match result {
                Ok(Ok(batch)) => {
                    let elapsed_ms = batch.elapsed.as_millis() as u64;
                    debug!(
                        exchange = %exchange,
                        count = batch.tickers.len(),
                        elapsed_ms,
                        "Tickers fetched"
                    );
                    collected.succeeded.push(ExchangeFetch {
                        exchange: Arc::clone(&exchange),
                        tickers: batch.tickers.len(),
                        unsupported: batch.unsupported,
                        rejected: batch.rejected,
                        elapsed_ms,
                    });
                    collected.table.extend(&exchange, batch.tickers);
                }
                Ok(Err(e)) => {
                    warn!(exchange = %exchange, error = %e, "Ticker fetch failed, skipping exchange this cycle");
                    collected.failed.push(ExchangeFailure {
                        exchange,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    let e = ExchangeError::NetworkTimeout(per_exchange_timeout.as_millis() as u64);
                    warn!(exchange = %exchange, error = %e, "Ticker fetch timed out, skipping exchange this cycle");
                    collected.failed.push(ExchangeFailure {
                        exchange,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !task_errors.is_empty() {
            let reason = format!("fetch task failed: {}", task_errors.join("; "));
            collected.mark_unreported(&self.names(), &reason);
        }

        collected.succeeded.sort_by(|a, b| a.exchange.cmp(&b.exchange));
        collected.failed.sort_by(|a, b| a.exchange.cmp(&b.exchange));
        collected
    }

    /// Freeze every adapter's funding cache into one lookup table.
    pub fn funding_table(&self) -> FundingRateTable {
        let mut table = FundingRateTable::new();
        for adapter in &self.adapters {
            table.insert_cache(Arc::from(adapter.name()), adapter.funding_cache());
        }
        table
    }

    /// Seed every funding cache from its snapshot, if a store is configured.
    ///
    /// Returns the number of records loaded. Failures are logged and leave
    /// the affected cache empty.
    pub fn warm_start_funding(&self) -> usize {
        let Some(store) = &self.snapshots else {
            return 0;
        };

        let mut loaded = 0;
        for adapter in &self.adapters {
            let name = adapter.name();
            match store.load_into(name, adapter.funding_cache()) {
                Ok(WarmStart::Loaded { records }) => {
                    info!(exchange = name, records, "Funding cache warm-started from snapshot");
                    loaded += records;
                }
                Ok(WarmStart::Expired { age_ms }) => {
                    info!(exchange = name, age_ms, "Funding snapshot expired, ignoring");
                }
                Ok(WarmStart::Missing) => {
                    debug!(exchange = name, "No funding snapshot");
                }
                Err(e) => {
                    warn!(exchange = name, error = %e, "Failed to load funding snapshot");
                }
            }
        }
        loaded
    }

    /// Start funding maintenance for every adapter.
    ///
    /// Push-fed adapters run their feed; the rest poll
    /// `refresh_funding_rates` every `refresh_every` (first refresh
    /// immediately). A failed refresh keeps the previous cache contents.
    /// With a snapshot store, caches are saved after each refresh (every
    /// `refresh_every` for push feeds).
    pub fn spawn_funding_tasks(
        &self,
        refresh_every: Duration,
        shutdown: &CancellationToken,
    ) -> JoinSet<()> {
        let mut tasks = JoinSet::new();

        for adapter in &self.adapters {
            if let Some(feed) = adapter.funding_feed() {
                info!(exchange = adapter.name(), "Starting funding push feed");
                tasks.spawn(feed.run(shutdown.clone()));
                if let Some(store) = &self.snapshots {
                    tasks.spawn(run_snapshot_saver(
                        Arc::clone(adapter),
                        Arc::clone(store),
                        refresh_every,
                        shutdown.clone(),
                    ));
                }
                continue;
            }

            let adapter = Arc::clone(adapter);
            let snapshots = self.snapshots.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                run_funding_refresh(adapter, snapshots, refresh_every, shutdown).await;
            });
        }
        tasks
    }
}

fn save_snapshot(adapter: &AnyAdapter, store: &FundingSnapshotStore) {
    if adapter.funding_cache().is_empty() {
        return;
    }
    if let Err(e) = store.save(adapter.name(), adapter.funding_cache()) {
        warn!(exchange = adapter.name(), error = %e, "Failed to save funding snapshot");
    }
}

async fn run_snapshot_saver(
    adapter: Arc<AnyAdapter>,
    store: Arc<FundingSnapshotStore>,
    save_every: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(save_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick fires immediately, before the feed has delivered anything
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => save_snapshot(&adapter, &store),
        }
    }
    save_snapshot(&adapter, &store);
}

async fn run_funding_refresh(
    adapter: Arc<AnyAdapter>,
    snapshots: Option<Arc<FundingSnapshotStore>>,
    refresh_every: Duration,
    shutdown: CancellationToken,
) {
    let name = adapter.name();
    let mut ticker = interval(refresh_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(exchange = name, interval_secs = refresh_every.as_secs(), "Funding refresh task started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = adapter.refresh_funding_rates() => match result {
                Ok(elapsed) => {
                    debug!(
                        exchange = name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        count = adapter.funding_cache().len(),
                        "Funding refresh complete"
                    );
                    if let Some(store) = &snapshots {
                        save_snapshot(&adapter, store);
                    }
                }
                Err(e) => warn!(exchange = name, error = %e, "Funding refresh failed, keeping cached rates"),
            },
        }
    }

    info!(exchange = name, "Funding refresh task stopped");
}
