//! Spread calculation engine for cross-exchange arbitrage detection
//!
//! Joins the per-cycle `PriceTable` across every exchange quoting a symbol
//! and evaluates each ordered pair (short venue A, long venue B):
//!
//! ```text
//! open_diff   = bid(A) - ask(B)
//! entry_pct   = open_diff / ((bid(A) + ask(B)) / 2) * 100     (0 unless open_diff > 0)
//! exit_diff   = bid(B) - ask(A)
//! exit_pct    = exit_diff / ((bid(B) + ask(A)) / 2) * 100     (signed)
//! funding_8h  = (rate(A) * 8/int(A) - rate(B) * 8/int(B)) * 100
//! ```
//!
//! A pair is emitted iff `entry_pct > 0`. Output is sorted by `entry_pct`
//! descending and then filtered by the optional threshold.
//!
//! The engine is a pure function of its inputs: no I/O, no locking, no
//! shared mutable state. Cost is O(Σ k²) for k exchanges per symbol.

use std::sync::Arc;

use serde::Serialize;

use crate::core::funding::FundingRateLookup;
use crate::core::price_table::PriceTable;
use crate::core::symbol::UnifiedSymbol;
use crate::core::types::{FundingRateRecord, Spread, TickerRecord};

/// Short side receives funding when the rate is positive
const SHORT_SIDE: f64 = 1.0;
/// Long side pays funding when the rate is positive
const LONG_SIDE: f64 = -1.0;

// =============================================================================
// Configuration & Stats
// =============================================================================

/// Engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpreadEngineConfig {
    /// Minimum entry spread (percent). `None` disables filtering.
    pub spread_threshold_pct: Option<f64>,
}

/// Counters describing one engine run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpreadStats {
    /// Symbols quoted by two or more exchanges
    pub symbols_joined: usize,
    /// Ordered exchange pairs evaluated (k × (k − 1) per symbol)
    pub pairs_evaluated: usize,
    /// Pairs with a positive entry spread
    pub opportunities: usize,
    /// Opportunities dropped by the threshold
    pub below_threshold: usize,
}

// =============================================================================
// SpreadEngine
// =============================================================================

/// Cross-exchange spread engine over an arbitrary set of exchanges.
#[derive(Debug, Clone, Default)]
pub struct SpreadEngine {
    config: SpreadEngineConfig,
}

impl SpreadEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SpreadEngineConfig) -> Self {
        Self { config }
    }

    /// Shorthand for an engine filtering at `threshold_pct`
    pub fn with_threshold(threshold_pct: f64) -> Self {
        Self::with_config(SpreadEngineConfig {
            spread_threshold_pct: Some(threshold_pct),
        })
    }

    pub fn config(&self) -> &SpreadEngineConfig {
        &self.config
    }

    /// Compute ranked opportunities for the whole table.
    #[must_use]
    pub fn compute(&self, table: &PriceTable, funding: &dyn FundingRateLookup) -> Vec<Spread> {
        self.compute_with_stats(table, funding).0
    }

    /// Same as [`compute`](Self::compute) plus run counters.
    pub fn compute_with_stats(
        &self,
        table: &PriceTable,
        funding: &dyn FundingRateLookup,
    ) -> (Vec<Spread>, SpreadStats) {
        let mut stats = SpreadStats::default();
        let mut spreads = Vec::new();

        for (symbol, quotes) in table.iter() {
            if quotes.len() < 2 {
                continue;
            }
            stats.symbols_joined += 1;

            // Stable venue order so output doesn't depend on HashMap iteration
            let mut venues: Vec<(&Arc<str>, &TickerRecord)> = quotes.iter().collect();
            venues.sort_by(|a, b| a.0.cmp(b.0));

            // One lookup per venue rather than per pair
            let rates: Vec<Option<FundingRateRecord>> = venues
                .iter()
                .map(|(exchange, _)| funding.lookup(exchange.as_ref(), symbol))
                .collect();

            for (i, (short_name, short_ticker)) in venues.iter().enumerate() {
                for (j, (long_name, long_ticker)) in venues.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    stats.pairs_evaluated += 1;

                    if let Some(spread) = Self::evaluate_pair(
                        symbol,
                        (*short_name, *short_ticker),
                        (*long_name, *long_ticker),
                        rates[i],
                        rates[j],
                    ) {
                        spreads.push(spread);
                    }
                }
            }
        }

        stats.opportunities = spreads.len();
        sort_spreads(&mut spreads);

        if let Some(threshold) = self.config.spread_threshold_pct {
            spreads.retain(|s| s.entry_spread_pct >= threshold);
        }
        stats.below_threshold = stats.opportunities - spreads.len();

        (spreads, stats)
    }

    /// Evaluate selling on `short` and buying on `long`.
    ///
    /// Returns `None` unless the entry spread is strictly positive.
    #[inline]
    pub fn evaluate_pair(
        symbol: &UnifiedSymbol,
        short: (&Arc<str>, &TickerRecord),
        long: (&Arc<str>, &TickerRecord),
        funding_short: Option<FundingRateRecord>,
        funding_long: Option<FundingRateRecord>,
    ) -> Option<Spread> {
        let (short_name, short_ticker) = short;
        let (long_name, long_ticker) = long;

        let (open_diff, entry_spread_pct) =
            Self::calculate_entry_spread(short_ticker.bid, long_ticker.ask);
        if entry_spread_pct <= 0.0 {
            return None;
        }

        let (exit_diff, exit_spread_pct) =
            Self::calculate_exit_spread(long_ticker.bid, short_ticker.ask);

        Some(Spread {
            unified_symbol: symbol.clone(),
            exchange_short: short_name.clone(),
            exchange_long: long_name.clone(),
            entry_spread_pct,
            open_diff,
            exit_spread_pct,
            exit_diff,
            funding_spread_8h_pct: Self::calculate_funding_spread_8h(
                funding_short.as_ref(),
                funding_long.as_ref(),
            ),
            funding_info_short: funding_short,
            funding_info_long: funding_long,
        })
    }

    // =========================================================================
    // Formulas
    // =========================================================================

    /// Entry: sell at `bid_short`, buy at `ask_long`.
    ///
    /// Returns `(open_diff, entry_pct)`. The percentage is 0 when the diff is
    /// not positive or the mid price is degenerate.
    #[inline]
    #[must_use]
    pub fn calculate_entry_spread(bid_short: f64, ask_long: f64) -> (f64, f64) {
        let open_diff = bid_short - ask_long;
        if !(open_diff > 0.0) {
            return (open_diff, 0.0);
        }
        (open_diff, percent_of_mid(open_diff, bid_short, ask_long))
    }

    /// Exit: sell at `bid_long`, buy back at `ask_short`.
    ///
    /// Returns `(exit_diff, exit_pct)`; the percentage is signed.
    #[inline]
    #[must_use]
    pub fn calculate_exit_spread(bid_long: f64, ask_short: f64) -> (f64, f64) {
        let exit_diff = bid_long - ask_short;
        (exit_diff, percent_of_mid(exit_diff, bid_long, ask_short))
    }

    /// Net 8h funding carry (percent) of holding short + long.
    ///
    /// Sign convention: the short leg earns a positive rate, the long leg pays
    /// it. Venue conventions differ, so treat this as an estimate. `None` when
    /// either side lacks data or has a zero interval.
    #[inline]
    pub fn calculate_funding_spread_8h(
        short: Option<&FundingRateRecord>,
        long: Option<&FundingRateRecord>,
    ) -> Option<f64> {
        let pnl_short = short?.pnl_8h(SHORT_SIDE)?;
        let pnl_long = long?.pnl_8h(LONG_SIDE)?;
        let total = (pnl_short + pnl_long) * 100.0;
        total.is_finite().then_some(total)
    }
}

/// `diff / mid * 100`, 0 for a non-positive mid or a non-finite result
#[inline]
fn percent_of_mid(diff: f64, px_a: f64, px_b: f64) -> f64 {
    let mid = (px_a + px_b) / 2.0;
    if !(mid > 0.0) {
        return 0.0;
    }
    let pct = (diff / mid) * 100.0;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

/// Entry spread descending, ties by symbol, short venue, long venue.
pub fn sort_spreads(spreads: &mut [Spread]) {
    spreads.sort_by(|a, b| {
        b.entry_spread_pct
            .total_cmp(&a.entry_spread_pct)
            .then_with(|| a.unified_symbol.cmp(&b.unified_symbol))
            .then_with(|| a.exchange_short.cmp(&b.exchange_short))
            .then_with(|| a.exchange_long.cmp(&b.exchange_long))
    });
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::funding::{FundingRateTable, NoFunding};

    const BTC: &str = "BTC/USDT:PERP";

    fn sym(s: &str) -> UnifiedSymbol {
        UnifiedSymbol::parse(s).unwrap()
    }

    fn ticker(symbol: &str, bid: f64, ask: f64) -> TickerRecord {
        TickerRecord {
            exchange_symbol: symbol.to_string(),
            unified_symbol: sym(symbol),
            bid,
            ask,
            volume_usd: 1_000_000.0,
        }
    }

    fn table(rows: &[(&str, &str, f64, f64)]) -> PriceTable {
        let mut t = PriceTable::new();
        for (exchange, symbol, bid, ask) in rows {
            t.insert(Arc::from(*exchange), ticker(symbol, *bid, *ask));
        }
        t
    }

    fn funding(rate: f64, interval_hours: u32) -> FundingRateRecord {
        FundingRateRecord {
            rate,
            interval_hours,
            next_settle_time_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let t = table(&[("A", BTC, 100.4, 100.5), ("B", BTC, 100.0, 100.1)]);
        let spreads = SpreadEngine::new().compute(&t, &NoFunding);

        assert_eq!(spreads.len(), 1);
        let s = &spreads[0];
        assert_eq!(s.exchange_short.as_ref(), "A");
        assert_eq!(s.exchange_long.as_ref(), "B");
        assert!((s.open_diff - 0.3).abs() < 1e-9);
        // 0.3 / 100.25 * 100
        assert!((s.entry_spread_pct - 0.299_251_87).abs() < 1e-6);
        // exit: bid(B) - ask(A) = 100.0 - 100.5
        assert!((s.exit_diff + 0.5).abs() < 1e-9);
        assert!((s.exit_spread_pct - (-0.5 / 100.25 * 100.0)).abs() < 1e-9);
        assert!(s.funding_spread_8h_pct.is_none());
    }

    #[test]
    fn test_no_cross_no_opportunity() {
        let t = table(&[("A", BTC, 100.0, 100.1), ("B", BTC, 100.05, 100.15)]);
        assert!(SpreadEngine::new().compute(&t, &NoFunding).is_empty());
    }

    #[test]
    fn test_both_directions_can_fire() {
        // Crossed books on both venues: both pairs have bid > other ask
        let t = table(&[("A", BTC, 101.0, 99.0), ("B", BTC, 101.0, 99.0)]);
        let spreads = SpreadEngine::new().compute(&t, &NoFunding);
        assert_eq!(spreads.len(), 2);
        assert_ne!(spreads[0].exchange_short, spreads[1].exchange_short);
    }

    #[test]
    fn test_single_exchange_excluded() {
        let t = table(&[("A", BTC, 101.0, 99.0)]);
        let (spreads, stats) = SpreadEngine::new().compute_with_stats(&t, &NoFunding);
        assert!(spreads.is_empty());
        assert_eq!(stats.symbols_joined, 0);
        assert_eq!(stats.pairs_evaluated, 0);
    }

    #[test]
    fn test_n_exchange_pair_count() {
        for n in [2usize, 3, 5] {
            let mut t = PriceTable::new();
            for k in 0..n {
                let px = 100.0 + k as f64;
                t.insert(Arc::from(format!("ex{}", k)), ticker(BTC, px, px + 0.01));
            }
            let (spreads, stats) = SpreadEngine::new().compute_with_stats(&t, &NoFunding);
            assert_eq!(stats.pairs_evaluated, n * (n - 1), "n = {}", n);
            assert!(spreads.len() <= n * (n - 1));
            // Every higher-priced venue beats every lower-priced one: n(n-1)/2
            assert_eq!(spreads.len(), n * (n - 1) / 2, "n = {}", n);
        }
    }

    #[test]
    fn test_sorted_descending_with_tiebreak() {
        let t = table(&[
            ("A", BTC, 101.0, 101.1),
            ("B", BTC, 100.0, 100.1),
            ("C", BTC, 102.0, 102.1),
            ("A", "ETH/USDT:PERP", 10.0, 10.01),
            ("B", "ETH/USDT:PERP", 10.5, 10.51),
        ]);
        let spreads = SpreadEngine::new().compute(&t, &NoFunding);
        assert!(!spreads.is_empty());
        for w in spreads.windows(2) {
            assert!(w[0].entry_spread_pct >= w[1].entry_spread_pct);
        }
        // ETH gap is the widest (~4.8%)
        assert_eq!(spreads[0].unified_symbol.as_str(), "ETH/USDT:PERP");
        assert_eq!(spreads[0].exchange_short.as_ref(), "B");
    }

    #[test]
    fn test_equal_spreads_ordered_by_symbol() {
        let t = table(&[
            ("A", "SOL/USDT:PERP", 101.0, 101.0),
            ("B", "SOL/USDT:PERP", 100.0, 100.0),
            ("A", "AVAX/USDT:PERP", 101.0, 101.0),
            ("B", "AVAX/USDT:PERP", 100.0, 100.0),
        ]);
        let spreads = SpreadEngine::new().compute(&t, &NoFunding);
        assert_eq!(spreads.len(), 2);
        assert_eq!(spreads[0].unified_symbol.as_str(), "AVAX/USDT:PERP");
        assert_eq!(spreads[1].unified_symbol.as_str(), "SOL/USDT:PERP");
    }

    #[test]
    fn test_threshold_filters() {
        let t = table(&[
            ("A", BTC, 100.4, 100.5),
            ("B", BTC, 100.0, 100.1),
            ("A", "ETH/USDT:PERP", 11.0, 11.0),
            ("B", "ETH/USDT:PERP", 10.0, 10.0),
        ]);
        let all = SpreadEngine::new().compute(&t, &NoFunding);
        assert_eq!(all.len(), 2);

        let (filtered, stats) = SpreadEngine::with_threshold(1.0).compute_with_stats(&t, &NoFunding);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].unified_symbol.as_str(), "ETH/USDT:PERP");
        assert_eq!(stats.opportunities, 2);
        assert_eq!(stats.below_threshold, 1);
    }

    #[test]
    fn test_threshold_inclusive() {
        let t = table(&[("A", BTC, 11.0, 11.0), ("B", BTC, 10.0, 10.0)]);
        let exact = SpreadEngine::new().compute(&t, &NoFunding)[0].entry_spread_pct;
        assert_eq!(SpreadEngine::with_threshold(exact).compute(&t, &NoFunding).len(), 1);
    }

    #[test]
    fn test_funding_spread_both_sides() {
        let t = table(&[("A", BTC, 100.4, 100.5), ("B", BTC, 100.0, 100.1)]);
        let mut f = FundingRateTable::new();
        // Short venue: 0.01% every 8h, long venue: -0.01% every 4h
        f.insert(Arc::from("A"), sym(BTC), funding(0.0001, 8));
        f.insert(Arc::from("B"), sym(BTC), funding(-0.0001, 4));

        let spreads = SpreadEngine::new().compute(&t, &f);
        let s = &spreads[0];
        // short: +0.0001, long: -(-0.0001 * 2) = +0.0002 → 0.03%
        assert!((s.funding_spread_8h_pct.unwrap() - 0.03).abs() < 1e-12);
        assert_eq!(s.funding_info_short.unwrap().rate, 0.0001);
        assert_eq!(s.funding_info_long.unwrap().interval_hours, 4);
    }

    #[test]
    fn test_funding_omitted_when_one_side_missing() {
        let t = table(&[("A", BTC, 100.4, 100.5), ("B", BTC, 100.0, 100.1)]);
        let mut f = FundingRateTable::new();
        f.insert(Arc::from("A"), sym(BTC), funding(0.0001, 8));

        let s = &SpreadEngine::new().compute(&t, &f)[0];
        assert!(s.funding_spread_8h_pct.is_none());
        assert!(s.funding_info_short.is_some());
        assert!(s.funding_info_long.is_none());
    }

    #[test]
    fn test_funding_omitted_on_zero_interval() {
        let t = table(&[("A", BTC, 100.4, 100.5), ("B", BTC, 100.0, 100.1)]);
        let mut f = FundingRateTable::new();
        f.insert(Arc::from("A"), sym(BTC), funding(0.0001, 0));
        f.insert(Arc::from("B"), sym(BTC), funding(0.0001, 8));

        let s = &SpreadEngine::new().compute(&t, &f)[0];
        assert!(s.funding_spread_8h_pct.is_none());
    }

    #[test]
    fn test_equal_funding_nets_to_zero() {
        let a = funding(0.0001, 8);
        let total = SpreadEngine::calculate_funding_spread_8h(Some(&a), Some(&a)).unwrap();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_degenerate_prices_do_not_panic() {
        let t = table(&[
            ("A", BTC, 0.0, 0.0),
            ("B", BTC, -5.0, -5.0),
            ("C", BTC, f64::NAN, f64::NAN),
        ]);
        let spreads = SpreadEngine::new().compute(&t, &NoFunding);
        for s in &spreads {
            assert!(s.entry_spread_pct.is_finite());
            assert!(s.exit_spread_pct.is_finite());
        }
    }

    #[test]
    fn test_non_positive_mid_yields_zero() {
        // open_diff > 0 but mid <= 0
        let (diff, pct) = SpreadEngine::calculate_entry_spread(1.0, -3.0);
        assert_eq!(diff, 4.0);
        assert_eq!(pct, 0.0);
        let (_, exit) = SpreadEngine::calculate_exit_spread(-1.0, -1.0);
        assert_eq!(exit, 0.0);
    }

    #[test]
    fn test_exit_spread_is_signed() {
        let (_, pos) = SpreadEngine::calculate_exit_spread(101.0, 100.0);
        let (_, neg) = SpreadEngine::calculate_exit_spread(100.0, 101.0);
        assert!(pos > 0.0);
        assert!(neg < 0.0);
    }

    // =========================================================================
    // Property-based tests (proptest)
    // =========================================================================
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn quotes() -> impl Strategy<Value = Vec<(f64, f64)>> {
            prop::collection::vec((1.0f64..50_000.0, 1.0f64..50_000.0), 1..6)
        }

        fn build(rows: &[(f64, f64)]) -> PriceTable {
            let mut t = PriceTable::new();
            for (k, (bid, ask)) in rows.iter().enumerate() {
                t.insert(Arc::from(format!("ex{}", k)), ticker(BTC, *bid, *ask));
            }
            t
        }

        proptest! {
            #[test]
            fn output_sorted_non_increasing(rows in quotes()) {
                let spreads = SpreadEngine::new().compute(&build(&rows), &NoFunding);
                for w in spreads.windows(2) {
                    prop_assert!(w[0].entry_spread_pct >= w[1].entry_spread_pct);
                }
            }

            #[test]
            fn emitted_iff_bid_exceeds_ask(rows in quotes()) {
                let t = build(&rows);
                let spreads = SpreadEngine::new().compute(&t, &NoFunding);
                for (i, (bid_a, _)) in rows.iter().enumerate() {
                    for (j, (_, ask_b)) in rows.iter().enumerate() {
                        if i == j { continue; }
                        let short = format!("ex{}", i);
                        let long = format!("ex{}", j);
                        let found = spreads.iter().any(|s| {
                            s.exchange_short.as_ref() == short && s.exchange_long.as_ref() == long
                        });
                        prop_assert_eq!(found, bid_a > ask_b);
                    }
                }
            }

            #[test]
            fn threshold_monotonic(rows in quotes(), lo in 0.0f64..5.0, delta in 0.0f64..5.0) {
                let t = build(&rows);
                let low = SpreadEngine::with_threshold(lo).compute(&t, &NoFunding);
                let high = SpreadEngine::with_threshold(lo + delta).compute(&t, &NoFunding);
                prop_assert!(high.len() <= low.len());
                for s in &high {
                    prop_assert!(low.contains(s));
                }
            }

            #[test]
            fn pair_count_is_quadratic(rows in quotes()) {
                let n = rows.len();
                let (spreads, stats) = SpreadEngine::new().compute_with_stats(&build(&rows), &NoFunding);
                let expected = if n >= 2 { n * (n - 1) } else { 0 };
                prop_assert_eq!(stats.pairs_evaluated, expected);
                prop_assert!(spreads.len() <= expected);
            }

            #[test]
            fn spreads_always_finite(bid in -1e12f64..1e12, ask in -1e12f64..1e12) {
                let (_, entry) = SpreadEngine::calculate_entry_spread(bid, ask);
                let (_, exit) = SpreadEngine::calculate_exit_spread(bid, ask);
                prop_assert!(entry.is_finite());
                prop_assert!(exit.is_finite());
                prop_assert!(entry >= 0.0);
            }
        }
    }
}
