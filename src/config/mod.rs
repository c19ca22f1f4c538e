//! Configuration module for scanner settings and YAML loading
//!
//! This module provides:
//! - Configuration types (`AppConfig`, `ExchangeId`, `OutputMode`, per-exchange settings)
//! - YAML loading functionality (`load_config`, `load_config_or_default`)
//! - Application constants with environment variable overrides
//! - Logging initialization

pub mod constants;
mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::{
    AppConfig, BinanceSettings, ExchangeId, FundingSnapshotSettings, MexcSettings, OutputMode,
};

// Re-export loader functions
pub use loader::{load_config, load_config_from_str, load_config_or_default};

pub use logging::{init_logging, LogFormat};
