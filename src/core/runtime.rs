//! Polling runtime
//!
//! One cycle = fetch every exchange concurrently (join barrier), freeze the
//! funding caches, run the spread engine, hand the report to the sink.
//! Funding refresh runs on its own tasks (see `ExchangeManager::spawn_funding_tasks`).

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::adapters::manager::ExchangeManager;
use crate::core::sink::{CycleReport, ResultSink};
use crate::core::spread::SpreadEngine;

/// Manager + engine + per-exchange timeout
pub struct Scanner {
    manager: ExchangeManager,
    engine: SpreadEngine,
    cycle_timeout: Duration,
}

impl Scanner {
    pub fn new(manager: ExchangeManager, engine: SpreadEngine, cycle_timeout: Duration) -> Self {
        Self {
            manager,
            engine,
            cycle_timeout,
        }
    }

    pub fn manager(&self) -> &ExchangeManager {
        &self.manager
    }

    /// Run one full cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle_id = Uuid::now_v7();
        let span = info_span!("cycle", cycle_id = %cycle_id);

        async {
            let started_at = Utc::now();
            let started = Instant::now();

            let collected = self.manager.collect_price_table(self.cycle_timeout).await;
            let funding = self.manager.funding_table();
            let (spreads, stats) = self.engine.compute_with_stats(&collected.table, &funding);

            CycleReport {
                cycle_id,
                started_at,
                elapsed_ms: started.elapsed().as_millis() as u64,
                spreads,
                stats,
                exchanges_ok: collected.succeeded,
                exchanges_failed: collected.failed,
            }
        }
        .instrument(span)
        .await
    }
}

/// Poll every `poll_interval` until `shutdown` is cancelled.
///
/// Missed ticks are skipped rather than bursted. A cycle in flight when
/// shutdown arrives is abandoned. Returns the number of published cycles.
pub async fn run_polling_loop(
    scanner: &Scanner,
    poll_interval: Duration,
    sink: &mut dyn ResultSink,
    shutdown: CancellationToken,
) -> u64 {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles: u64 = 0;

    info!(
        poll_interval_ms = poll_interval.as_millis() as u64,
        exchanges = ?scanner.manager().names(),
        "Polling loop started"
    );

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let report = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            report = scanner.run_cycle() => report,
        };

        if let Err(e) = sink.publish(&report) {
            error!(cycle_id = %report.cycle_id, error = %e, "Failed to publish cycle");
        }
        cycles += 1;
    }

    info!(cycles, "Polling loop stopped");
    cycles
}
