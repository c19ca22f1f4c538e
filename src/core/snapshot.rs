//! Funding cache warm start
//!
//! After every successful refresh an exchange's funding cache is written to
//! `<dir>/<exchange>_funding.json`. On startup a snapshot younger than the
//! TTL is loaded back so the first cycles already carry funding data.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::funding::FundingRateCache;
use crate::core::symbol::UnifiedSymbol;
use crate::core::types::{current_time_ms, FundingRateRecord};
use crate::error::Result;

/// Funding settles at most every 8h, older data is not worth loading
pub const DEFAULT_SNAPSHOT_TTL_SECS: u64 = 8 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    symbol: String,
    #[serde(flatten)]
    record: FundingRateRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct FundingSnapshot {
    exchange: String,
    saved_at_ms: u64,
    rates: Vec<SnapshotEntry>,
}

/// Outcome of one warm-start attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmStart {
    /// No snapshot on disk
    Missing,
    /// Snapshot older than the TTL, ignored
    Expired { age_ms: u64 },
    /// Records inserted into the cache
    Loaded { records: usize },
}

/// Directory of per-exchange funding snapshots
#[derive(Debug, Clone)]
pub struct FundingSnapshotStore {
    dir: PathBuf,
    ttl: Duration,
}

impl FundingSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn path_for(&self, exchange: &str) -> PathBuf {
        self.dir.join(format!("{}_funding.json", exchange))
    }

    /// Persist the cache contents, replacing any previous snapshot.
    ///
    /// Written to a temporary file first and renamed into place, so a reader
    /// never sees a partial snapshot. Returns the number of records written.
    pub fn save(&self, exchange: &str, cache: &FundingRateCache) -> Result<usize> {
        let mut rates: Vec<SnapshotEntry> = cache
            .snapshot()
            .into_iter()
            .map(|(symbol, record)| SnapshotEntry {
                symbol: symbol.as_str().to_string(),
                record,
            })
            .collect();
        rates.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let count = rates.len();

        let snapshot = FundingSnapshot {
            exchange: exchange.to_string(),
            saved_at_ms: cache.last_refresh_ms().unwrap_or_else(current_time_ms),
            rates,
        };

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(exchange);
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(exchange, records = count, path = %path.display(), "Funding snapshot saved");
        Ok(count)
    }

    /// Seed `cache` from the exchange's snapshot if one exists and is fresh.
    ///
    /// A corrupt file or an entry with a malformed symbol fails the whole
    /// load and leaves the cache untouched.
    pub fn load_into(&self, exchange: &str, cache: &FundingRateCache) -> Result<WarmStart> {
        self.load_at(exchange, cache, current_time_ms())
    }

    fn load_at(&self, exchange: &str, cache: &FundingRateCache, now_ms: u64) -> Result<WarmStart> {
        let path = self.path_for(exchange);
        if !path.exists() {
            return Ok(WarmStart::Missing);
        }

        let snapshot = read_snapshot(&path)?;
        let age_ms = now_ms.saturating_sub(snapshot.saved_at_ms);
        if u128::from(age_ms) > self.ttl.as_millis() {
            return Ok(WarmStart::Expired { age_ms });
        }

        let mut rates = HashMap::with_capacity(snapshot.rates.len());
        for entry in snapshot.rates {
            rates.insert(UnifiedSymbol::parse(&entry.symbol)?, entry.record);
        }
        let records = cache.restore(rates, snapshot.saved_at_ms);
        Ok(WarmStart::Loaded { records })
    }
}

fn read_snapshot(path: &Path) -> Result<FundingSnapshot> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::core::symbol::SymbolError;
    use tempfile::TempDir;

    fn rec(rate: f64) -> FundingRateRecord {
        FundingRateRecord {
            rate,
            interval_hours: 8,
            next_settle_time_ms: 1_700_000_000_000,
        }
    }

    fn filled_cache() -> FundingRateCache {
        let cache = FundingRateCache::new();
        let mut rates = HashMap::new();
        rates.insert(UnifiedSymbol::parse("BTC/USDT:PERP").unwrap(), rec(0.0001));
        rates.insert(UnifiedSymbol::parse("ETH/USDT:PERP").unwrap(), rec(-0.0002));
        cache.replace_all(rates);
        cache
    }

    #[test]
    fn test_saved_snapshot_warm_starts_empty_cache() {
        let dir = TempDir::new().unwrap();
        let store = FundingSnapshotStore::new(dir.path(), Duration::from_secs(3600));
        let source = filled_cache();
        assert_eq!(store.save("mexc", &source).unwrap(), 2);
        assert!(store.path_for("mexc").exists());
        assert!(!store.path_for("mexc").with_extension("json.tmp").exists());

        let cache = FundingRateCache::new();
        assert_eq!(
            store.load_into("mexc", &cache).unwrap(),
            WarmStart::Loaded { records: 2 }
        );
        assert_eq!(cache.get("ETH/USDT:PERP").unwrap().rate, -0.0002);
        assert_eq!(cache.last_refresh_ms(), source.last_refresh_ms());
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FundingSnapshotStore::new(dir.path().join("nested"), Duration::from_secs(60));
        let cache = FundingRateCache::new();
        assert_eq!(store.load_into("binance", &cache).unwrap(), WarmStart::Missing);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_snapshot_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = FundingSnapshotStore::new(dir.path(), Duration::from_secs(60));
        let source = filled_cache();
        store.save("mexc", &source).unwrap();
        let saved_at = source.last_refresh_ms().unwrap();

        let cache = FundingRateCache::new();
        let outcome = store.load_at("mexc", &cache, saved_at + 61_000).unwrap();
        assert_eq!(outcome, WarmStart::Expired { age_ms: 61_000 });
        assert!(cache.is_empty());

        let outcome = store.load_at("mexc", &cache, saved_at + 59_000).unwrap();
        assert_eq!(outcome, WarmStart::Loaded { records: 2 });
    }

    #[test]
    fn test_malformed_symbol_rejects_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FundingSnapshotStore::new(dir.path(), Duration::from_secs(3600));
        let body = format!(
            r#"{{"exchange":"mexc","saved_at_ms":{},"rates":[
                {{"symbol":"BTC/USDT:PERP","rate":0.0001,"interval":8,"next_settle_time":1}},
                {{"symbol":"BTC_USDT","rate":0.0001,"interval":8,"next_settle_time":1}}
            ]}}"#,
            current_time_ms()
        );
        fs::write(store.path_for("mexc"), body).unwrap();

        let cache = FundingRateCache::new();
        let result = store.load_into("mexc", &cache);
        assert!(matches!(
            result,
            Err(AppError::Symbol(SymbolError::InvalidUnifiedSymbolFormat(_)))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let store = FundingSnapshotStore::new(dir.path(), Duration::from_secs(3600));
        fs::write(store.path_for("binance"), "{not json").unwrap();
        let result = store.load_into("binance", &FundingRateCache::new());
        assert!(matches!(result, Err(AppError::Serialization(_))));
    }
}
