//! Per-cycle price table: `symbol → exchange → ticker`.
//!
//! Built fresh by the exchange manager after every exchange's fetch has
//! completed, handed read-only to the spread engine and then dropped.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::symbol::UnifiedSymbol;
use crate::core::types::TickerRecord;

/// Multi-symbol, multi-exchange snapshot of best bid/ask.
///
/// The exchange set is whatever names were inserted; nothing here assumes a
/// fixed number of venues.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    /// symbol → exchange → latest ticker
    prices: HashMap<UnifiedSymbol, HashMap<Arc<str>, TickerRecord>>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Insert a ticker for `exchange`.
    ///
    /// Duplicate (symbol, exchange) keys overwrite: last write wins.
    pub fn insert(&mut self, exchange: Arc<str>, ticker: TickerRecord) {
        self.prices
            .entry(ticker.unified_symbol.clone())
            .or_default()
            .insert(exchange, ticker);
    }

    /// Merge a whole batch from one exchange.
    pub fn extend<I>(&mut self, exchange: &Arc<str>, tickers: I)
    where
        I: IntoIterator<Item = TickerRecord>,
    {
        for ticker in tickers {
            self.insert(exchange.clone(), ticker);
        }
    }

    /// Raw ticker for a specific exchange + symbol.
    pub fn get(&self, exchange: &str, symbol: &str) -> Option<&TickerRecord> {
        self.prices.get(symbol)?.get(exchange)
    }

    /// Iterate `(symbol, quotes)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&UnifiedSymbol, &HashMap<Arc<str>, TickerRecord>)> {
        self.prices.iter()
    }

    /// Number of symbols currently tracked.
    pub fn symbol_count(&self) -> usize {
        self.prices.len()
    }

    /// Total number of exchange quotes stored.
    pub fn quote_count(&self) -> usize {
        self.prices.values().map(|m| m.len()).sum()
    }

    /// Symbols quoted by at least two exchanges (the only joinable ones).
    pub fn joinable_symbol_count(&self) -> usize {
        self.prices.values().filter(|m| m.len() >= 2).count()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
