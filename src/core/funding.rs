//! Funding rate caches and per-cycle lookup tables.
//!
//! Each adapter owns one `FundingRateCache`, refreshed on its own cadence
//! (REST poll or WebSocket push) independently of ticker polling. Before the
//! spread engine runs, the runtime freezes every cache into a
//! `FundingRateTable` and passes it explicitly to the engine.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::symbol::UnifiedSymbol;
use crate::core::types::{current_time_ms, FundingRateRecord};

/// Funding data source consulted by the spread engine.
///
/// Absence is a normal outcome, never an error.
pub trait FundingRateLookup {
    fn lookup(&self, exchange: &str, symbol: &UnifiedSymbol) -> Option<FundingRateRecord>;
}

/// Lookup that never has data (tickers-only runs and tests)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFunding;

impl FundingRateLookup for NoFunding {
    fn lookup(&self, _exchange: &str, _symbol: &UnifiedSymbol) -> Option<FundingRateRecord> {
        None
    }
}

// =============================================================================
// FundingRateCache
// =============================================================================

/// Thread-safe funding cache for a single exchange.
///
/// Readers may observe data older than the current ticker snapshot; that is
/// accepted by the engine.
#[derive(Debug, Default)]
pub struct FundingRateCache {
    rates: RwLock<HashMap<UnifiedSymbol, FundingRateRecord>>,
    /// Epoch ms of the last full refresh or push (0 = never)
    last_refresh_ms: AtomicU64,
}

impl FundingRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<UnifiedSymbol, FundingRateRecord>> {
        self.rates.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<UnifiedSymbol, FundingRateRecord>> {
        self.rates.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, symbol: &str) -> Option<FundingRateRecord> {
        self.read().get(symbol).copied()
    }

    /// Swap in a freshly fetched map in one step.
    pub fn replace_all(&self, rates: HashMap<UnifiedSymbol, FundingRateRecord>) {
        *self.write() = rates;
        self.last_refresh_ms.store(current_time_ms(), Ordering::Relaxed);
    }

    /// Insert or overwrite a single record (streaming updates).
    pub fn upsert(&self, symbol: UnifiedSymbol, record: FundingRateRecord) {
        self.write().insert(symbol, record);
        self.last_refresh_ms.store(current_time_ms(), Ordering::Relaxed);
    }

    /// Seed from persisted data without overwriting anything fresher.
    ///
    /// Only symbols not yet cached are inserted. The refresh stamp is set to
    /// `refreshed_at_ms` when the cache has never been refreshed. Returns the
    /// number of records inserted.
    pub fn restore(
        &self,
        rates: HashMap<UnifiedSymbol, FundingRateRecord>,
        refreshed_at_ms: u64,
    ) -> usize {
        let mut inserted = 0;
        {
            let mut guard = self.write();
            for (symbol, record) in rates {
                if let Entry::Vacant(slot) = guard.entry(symbol) {
                    slot.insert(record);
                    inserted += 1;
                }
            }
        }
        let _ = self.last_refresh_ms.compare_exchange(
            0,
            refreshed_at_ms,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
        inserted
    }

    /// Drop all cached data; lookups return `None` until the next refresh.
    pub fn invalidate(&self) {
        self.write().clear();
        self.last_refresh_ms.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Epoch ms of the last update, `None` if never refreshed
    pub fn last_refresh_ms(&self) -> Option<u64> {
        match self.last_refresh_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> HashMap<UnifiedSymbol, FundingRateRecord> {
        self.read().clone()
    }
}

// =============================================================================
// FundingRateTable
// =============================================================================

/// Immutable cross-exchange funding snapshot for one cycle.
#[derive(Debug, Clone, Default)]
pub struct FundingRateTable {
    /// exchange → symbol → record
    rates: HashMap<Arc<str>, HashMap<UnifiedSymbol, FundingRateRecord>>,
}

impl FundingRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze one exchange's cache into the table.
    pub fn insert_cache(&mut self, exchange: Arc<str>, cache: &FundingRateCache) {
        self.rates.insert(exchange, cache.snapshot());
    }

    pub fn insert(&mut self, exchange: Arc<str>, symbol: UnifiedSymbol, record: FundingRateRecord) {
        self.rates.entry(exchange).or_default().insert(symbol, record);
    }

    /// Total records across exchanges
    pub fn len(&self) -> usize {
        self.rates.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FundingRateLookup for FundingRateTable {
    fn lookup(&self, exchange: &str, symbol: &UnifiedSymbol) -> Option<FundingRateRecord> {
        self.rates.get(exchange)?.get(symbol).copied()
    }
}
