//! Core module - symbols, price table, funding caches, spread engine, sinks, runtime
//!
//! This module uses **explicit re-exports** instead of glob exports (`pub use module::*`)
//! to provide better API visibility and prevent accidental public API changes.
//!
//! ## Usage
//! Prefer importing from `crate::core`:
//! ```ignore
//! use crate::core::{PriceTable, SpreadEngine, UnifiedSymbol};
//! ```

pub mod funding;
pub mod price_table;
pub mod runtime;
pub mod sink;
pub mod snapshot;
pub mod spread;
pub mod symbol;
pub mod types;

// Explicit re-exports for symbol module
pub use symbol::{unwrap_with_suffix, wrap_with_suffix, SymbolError, SymbolResult, UnifiedSymbol};

// Explicit re-exports for types module
pub use types::{current_time_ms, FundingRateRecord, Spread, TickerRecord};

// Explicit re-exports for price_table module
pub use price_table::PriceTable;

// Explicit re-exports for funding module
pub use funding::{FundingRateCache, FundingRateLookup, FundingRateTable, NoFunding};

// Explicit re-exports for spread module
pub use spread::{sort_spreads, SpreadEngine, SpreadEngineConfig, SpreadStats};

// Explicit re-exports for sink module
pub use sink::{CycleReport, JsonLinesSink, LogSink, ResultSink};

// Explicit re-exports for snapshot module
pub use snapshot::{FundingSnapshotStore, WarmStart};

// Explicit re-exports for runtime module
pub use runtime::{run_polling_loop, Scanner};
