//! Result sinks: where each cycle's ranked spreads end up.
//!
//! `LogSink` reports through tracing; `JsonLinesSink` writes one JSON object
//! per spread to any `Write` (stdout in production, a buffer in tests).

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::adapters::manager::{ExchangeFailure, ExchangeFetch};
use crate::core::spread::SpreadStats;
use crate::core::types::Spread;
use crate::error::{AppError, Result};

// =============================================================================
// Cycle Report
// =============================================================================

/// Everything one polling cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// UUID v7, time-ordered
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Ranked, threshold-filtered
    pub spreads: Vec<Spread>,
    pub stats: SpreadStats,
    pub exchanges_ok: Vec<ExchangeFetch>,
    pub exchanges_failed: Vec<ExchangeFailure>,
}

/// Destination for cycle reports
pub trait ResultSink: Send {
    fn publish(&mut self, report: &CycleReport) -> Result<()>;
}

// =============================================================================
// LogSink
// =============================================================================

/// Logs a cycle summary and the top-N opportunities
#[derive(Debug, Clone)]
pub struct LogSink {
    top_n: usize,
}

impl LogSink {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }
}

impl ResultSink for LogSink {
    fn publish(&mut self, report: &CycleReport) -> Result<()> {
        let ok: Vec<&str> = report.exchanges_ok.iter().map(|e| &*e.exchange).collect();
        let failed: Vec<&str> = report.exchanges_failed.iter().map(|e| &*e.exchange).collect();

        info!(
            cycle_id = %report.cycle_id,
            opportunities = report.spreads.len(),
            symbols_joined = report.stats.symbols_joined,
            pairs_evaluated = report.stats.pairs_evaluated,
            below_threshold = report.stats.below_threshold,
            exchanges_ok = ?ok,
            exchanges_failed = ?failed,
            elapsed_ms = report.elapsed_ms,
            "Cycle complete"
        );

        for (rank, spread) in report.spreads.iter().take(self.top_n).enumerate() {
            info!(
                cycle_id = %report.cycle_id,
                rank = rank + 1,
                symbol = %spread.unified_symbol,
                sell_on = %spread.exchange_short,
                buy_on = %spread.exchange_long,
                entry_spread_pct = %format!("{:.4}", spread.entry_spread_pct),
                exit_spread_pct = %format!("{:.4}", spread.exit_spread_pct),
                funding_8h_pct = ?spread.funding_spread_8h_pct,
                "Opportunity"
            );
        }
        Ok(())
    }
}

// =============================================================================
// JsonLinesSink
// =============================================================================

#[derive(Serialize)]
struct SpreadLine<'a> {
    cycle_id: Uuid,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    spread: &'a Spread,
}

/// Writes every spread as one JSON object per line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ResultSink for JsonLinesSink<W> {
    fn publish(&mut self, report: &CycleReport) -> Result<()> {
        for spread in &report.spreads {
            let line = SpreadLine {
                cycle_id: report.cycle_id,
                ts: report.started_at,
                spread,
            };
            serde_json::to_writer(&mut self.writer, &line)?;
            self.writer
                .write_all(b"\n")
                .map_err(|e| AppError::Sink(format!("write failed: {}", e)))?;
        }
        self.writer
            .flush()
            .map_err(|e| AppError::Sink(format!("flush failed: {}", e)))
    }
}
