//! Configuration types for scanner settings
//!
//! This module defines all configuration structs that are loaded from YAML.
//! Every field has a default so a partial (or missing) file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::adapters::binance::BinanceConfig;
use crate::adapters::mexc::{FundingSource, MexcConfig};
use crate::core::snapshot::{FundingSnapshotStore, DEFAULT_SNAPSHOT_TTL_SECS};
use crate::core::spread::SpreadEngineConfig;
use crate::error::AppError;

use super::constants::{
    poll_interval_override, spread_threshold_override, DEFAULT_CYCLE_TIMEOUT_MS,
    DEFAULT_FUNDING_REFRESH_SECS, DEFAULT_LOG_TOP_N, DEFAULT_POLL_INTERVAL_SECS,
};

// ============================================================================
// Enums
// ============================================================================

/// Supported exchanges
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Binance,
    Mexc,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 2] = [ExchangeId::Binance, ExchangeId::Mexc];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Binance => "binance",
            ExchangeId::Mexc => "mexc",
        }
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where each cycle's results go
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Summary + top-N via tracing
    #[default]
    Log,
    /// One JSON object per spread on stdout
    JsonLines,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Binance endpoint overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BinanceSettings {
    /// REST base URL (tests point this at a local mock)
    pub base_url: Option<String>,
}

/// MEXC endpoint overrides and funding tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MexcSettings {
    pub base_url: Option<String>,
    pub ws_url: Option<String>,
    pub funding_source: FundingSource,
    pub restart_interval_secs: u64,
    pub invalidate_on_restart: bool,
    pub funding_chunk_size: usize,
    pub funding_chunk_delay_ms: u64,
    pub ws_subscriptions_per_connection: usize,
    pub ws_ping_interval_secs: u64,
}

impl Default for MexcSettings {
    fn default() -> Self {
        let defaults = MexcConfig::default();
        Self {
            base_url: None,
            ws_url: None,
            funding_source: defaults.funding_source,
            restart_interval_secs: defaults.restart_interval.as_secs(),
            invalidate_on_restart: defaults.invalidate_on_restart,
            funding_chunk_size: defaults.funding_chunk_size,
            funding_chunk_delay_ms: defaults.funding_chunk_delay.as_millis() as u64,
            ws_subscriptions_per_connection: defaults.ws_subscriptions_per_connection,
            ws_ping_interval_secs: defaults.ws_ping_interval.as_secs(),
        }
    }
}

impl MexcSettings {
    fn validate(&self) -> Result<(), AppError> {
        if self.funding_chunk_size == 0 {
            return Err(AppError::Config("mexc.funding_chunk_size must be > 0".to_string()));
        }
        if self.ws_subscriptions_per_connection == 0 {
            return Err(AppError::Config(
                "mexc.ws_subscriptions_per_connection must be > 0".to_string(),
            ));
        }
        if self.ws_ping_interval_secs == 0 {
            return Err(AppError::Config("mexc.ws_ping_interval_secs must be > 0".to_string()));
        }
        if self.restart_interval_secs == 0 {
            return Err(AppError::Config("mexc.restart_interval_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Funding cache warm start; disabled unless `dir` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingSnapshotSettings {
    pub dir: Option<String>,
    /// Snapshots older than this are ignored on startup
    pub ttl_secs: u64,
}

impl Default for FundingSnapshotSettings {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: DEFAULT_SNAPSHOT_TTL_SECS,
        }
    }
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds between polling cycles
    pub poll_interval_secs: u64,
    /// Minimum entry spread (percent) to report; `None` reports everything
    pub spread_threshold_pct: Option<f64>,
    /// Exchanges to poll
    pub exchanges: Vec<ExchangeId>,
    /// Per-exchange budget for one ticker fetch
    pub cycle_timeout_ms: u64,
    /// Seconds between REST funding refreshes
    pub funding_refresh_secs: u64,
    /// Opportunities logged per cycle
    pub log_top_n: usize,
    pub output: OutputMode,
    pub binance: BinanceSettings,
    pub mexc: MexcSettings,
    pub funding_snapshot: FundingSnapshotSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            spread_threshold_pct: None,
            exchanges: ExchangeId::ALL.to_vec(),
            cycle_timeout_ms: DEFAULT_CYCLE_TIMEOUT_MS,
            funding_refresh_secs: DEFAULT_FUNDING_REFRESH_SECS,
            log_top_n: DEFAULT_LOG_TOP_N,
            output: OutputMode::default(),
            binance: BinanceSettings::default(),
            mexc: MexcSettings::default(),
            funding_snapshot: FundingSnapshotSettings::default(),
        }
    }
}

impl AppConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config("poll_interval_secs must be > 0".to_string()));
        }

        if let Some(threshold) = self.spread_threshold_pct {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(AppError::Config(format!(
                    "spread_threshold_pct must be a finite value >= 0 (got {})",
                    threshold
                )));
            }
        }

        if self.exchanges.is_empty() {
            return Err(AppError::Config(
                "Configuration must contain at least one exchange".to_string(),
            ));
        }
        let mut seen = self.exchanges.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.exchanges.len() {
            return Err(AppError::Config(format!(
                "Duplicate exchange in exchanges list: {:?}",
                self.exchanges
            )));
        }

        if self.cycle_timeout_ms == 0 {
            return Err(AppError::Config("cycle_timeout_ms must be > 0".to_string()));
        }
        if self.funding_refresh_secs == 0 {
            return Err(AppError::Config("funding_refresh_secs must be > 0".to_string()));
        }

        if self.funding_snapshot.ttl_secs == 0 {
            return Err(AppError::Config("funding_snapshot.ttl_secs must be > 0".to_string()));
        }

        self.mexc.validate()
    }

    /// Apply `POLL_INTERVAL_SECS` / `SPREAD_THRESHOLD_PCT` overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(secs) = poll_interval_override() {
            self.poll_interval_secs = secs;
        }
        if let Some(threshold) = spread_threshold_override() {
            self.spread_threshold_pct = Some(threshold);
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }

    pub fn funding_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.funding_refresh_secs)
    }

    pub fn engine_config(&self) -> SpreadEngineConfig {
        SpreadEngineConfig {
            spread_threshold_pct: self.spread_threshold_pct,
        }
    }

    pub fn funding_snapshot_store(&self) -> Option<FundingSnapshotStore> {
        self.funding_snapshot.dir.as_ref().map(|dir| {
            FundingSnapshotStore::new(dir, Duration::from_secs(self.funding_snapshot.ttl_secs))
        })
    }

    pub fn binance_config(&self) -> BinanceConfig {
        BinanceConfig::with_base_url(self.binance.base_url.as_deref())
    }

    pub fn mexc_config(&self) -> MexcConfig {
        let mut config = MexcConfig::with_base_url(self.mexc.base_url.as_deref());
        if let Some(ws_url) = &self.mexc.ws_url {
            config.ws_url = ws_url.clone();
        }
        config.funding_source = self.mexc.funding_source;
        config.restart_interval = Duration::from_secs(self.mexc.restart_interval_secs);
        config.invalidate_on_restart = self.mexc.invalidate_on_restart;
        config.funding_chunk_size = self.mexc.funding_chunk_size;
        config.funding_chunk_delay = Duration::from_millis(self.mexc.funding_chunk_delay_ms);
        config.ws_subscriptions_per_connection = self.mexc.ws_subscriptions_per_connection;
        config.ws_ping_interval = Duration::from_secs(self.mexc.ws_ping_interval_secs);
        config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exchanges, vec![ExchangeId::Binance, ExchangeId::Mexc]);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.cycle_timeout(), Duration::from_millis(4000));
        assert!(config.spread_threshold_pct.is_none());
        assert_eq!(config.output, OutputMode::Log);
    }

    #[test]
    fn test_full_config_deserialize() {
        let yaml = r#"
poll_interval_secs: 10
spread_threshold_pct: 0.2
exchanges: [mexc, binance]
cycle_timeout_ms: 2500
funding_refresh_secs: 120
log_top_n: 3
output: json_lines
binance:
  base_url: http://127.0.0.1:9000
mexc:
  funding_source: websocket
  restart_interval_secs: 600
  invalidate_on_restart: true
  ws_subscriptions_per_connection: 15
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.exchanges, vec![ExchangeId::Mexc, ExchangeId::Binance]);
        assert_eq!(config.spread_threshold_pct, Some(0.2));
        assert_eq!(config.output, OutputMode::JsonLines);
        assert_eq!(config.binance_config().base_url, "http://127.0.0.1:9000");

        let mexc = config.mexc_config();
        assert_eq!(mexc.funding_source, FundingSource::Websocket);
        assert_eq!(mexc.restart_interval, Duration::from_secs(600));
        assert!(mexc.invalidate_on_restart);
        assert_eq!(mexc.ws_subscriptions_per_connection, 15);
        assert_eq!(mexc.funding_chunk_size, 10);
        assert_eq!(mexc.base_url, "https://contract.mexc.com");
    }

    #[test]
    fn test_empty_exchanges_fails() {
        let config = AppConfig {
            exchanges: vec![],
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("at least one exchange"));
    }

    #[test]
    fn test_duplicate_exchange_fails() {
        let config = AppConfig {
            exchanges: vec![ExchangeId::Binance, ExchangeId::Binance],
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Duplicate exchange"));
    }

    #[test]
    fn test_negative_threshold_fails() {
        let config = AppConfig {
            spread_threshold_pct: Some(-0.1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_threshold_fails() {
        let config = AppConfig {
            spread_threshold_pct: Some(f64::NAN),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_is_valid() {
        let config = AppConfig {
            spread_threshold_pct: Some(0.0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_cycle_timeout_fails() {
        let config = AppConfig {
            cycle_timeout_ms: 0,
            ..Default::default()
        };
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("cycle_timeout_ms"));
    }

    #[test]
    fn test_zero_mexc_chunk_size_fails() {
        let mut config = AppConfig::default();
        config.mexc.funding_chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_exchange_rejected() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("exchanges: [kraken]");
        assert!(result.is_err());
    }

    #[test]
    fn test_funding_snapshot_section() {
        assert!(AppConfig::default().funding_snapshot_store().is_none());

        let yaml = "funding_snapshot:\n  dir: /var/lib/scanner\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.funding_snapshot.ttl_secs, 8 * 60 * 60);
        let store = config.funding_snapshot_store().unwrap();
        assert_eq!(
            store.path_for("mexc"),
            std::path::Path::new("/var/lib/scanner/mexc_funding.json")
        );
    }

    #[test]
    fn test_zero_snapshot_ttl_fails() {
        let mut config = AppConfig::default();
        config.funding_snapshot.ttl_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("ttl_secs"));
    }

    #[test]
    fn test_exchange_id_display() {
        assert_eq!(ExchangeId::Binance.to_string(), "binance");
        assert_eq!(ExchangeId::Mexc.to_string(), "mexc");
    }
}
