//! Unified cross-exchange instrument identifiers
//!
//! Every adapter maps its native symbol (`BTCUSDT`, `BTC_USDT`, ...) onto a
//! single canonical key of the form `BASE/QUOTE:PERP`. Two venues quoting the
//! same instrument must produce byte-identical keys or they are never joined
//! by the spread engine.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The only quote currency currently supported (USDT-margined perpetuals)
pub const SUPPORTED_QUOTE: &str = "USDT";

/// Contract-type suffix of every unified symbol
pub const PERP_SUFFIX: &str = "PERP";

/// Symbol mapping failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// Exchange instrument is quoted in something other than USDT.
    /// Routine for raw exchange catalogs and filtered silently.
    #[error("Unsupported quote currency for symbol: {0}")]
    UnsupportedQuoteCurrency(String),

    /// Input is not `BASE/QUOTE:PERP`. Indicates a broken symbol table.
    #[error("Invalid unified symbol format: {0}")]
    InvalidUnifiedSymbolFormat(String),

    /// Exchange symbol has the right suffix but no usable base asset
    #[error("Invalid exchange symbol: {0}")]
    InvalidExchangeSymbol(String),
}

/// Result type alias for symbol conversions
pub type SymbolResult<T> = std::result::Result<T, SymbolError>;

/// Canonical `BASE/QUOTE:PERP` instrument key.
///
/// Cheap to clone (`Arc<str>`), so the same key can be shared by the price
/// table, the funding caches and every emitted opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnifiedSymbol(Arc<str>);

impl UnifiedSymbol {
    /// Build a perpetual symbol from its components.
    pub fn perp(base: &str, quote: &str) -> SymbolResult<Self> {
        Self::parse(&format!("{}/{}:{}", base, quote, PERP_SUFFIX))
    }

    /// Parse and validate a canonical symbol string.
    ///
    /// Exactly two `/`-separated parts are required, the second being
    /// `QUOTE:PERP`. Base and quote must be non-empty and may not contain
    /// separators or whitespace.
    pub fn parse(raw: &str) -> SymbolResult<Self> {
        let invalid = || SymbolError::InvalidUnifiedSymbolFormat(raw.to_string());

        let mut parts = raw.split('/');
        let base = parts.next().ok_or_else(invalid)?;
        let rest = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let (quote, contract) = rest.split_once(':').ok_or_else(invalid)?;
        if contract != PERP_SUFFIX {
            return Err(invalid());
        }
        if !is_asset_code(base) || !is_asset_code(quote) {
            return Err(invalid());
        }

        Ok(Self(Arc::from(raw)))
    }

    /// Base asset (e.g. `BTC`)
    pub fn base(&self) -> &str {
        // Validated in `parse`, the separator is always present
        self.0.split('/').next().unwrap_or_default()
    }

    /// Quote asset (e.g. `USDT`)
    pub fn quote(&self) -> &str {
        self.0
            .split('/')
            .nth(1)
            .and_then(|rest| rest.split(':').next())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_asset_code(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c == '/' || c == ':' || c.is_whitespace())
}

impl fmt::Display for UnifiedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UnifiedSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for UnifiedSymbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for UnifiedSymbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for UnifiedSymbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UnifiedSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Convert `<base><suffix>` exchange symbols, shared by adapters whose native
/// format is just the base asset followed by a fixed quote marker.
///
/// `suffix` is the exchange-specific quote marker (`USDT`, `_USDT`).
pub fn unwrap_with_suffix(exchange_symbol: &str, suffix: &str) -> SymbolResult<UnifiedSymbol> {
    let base = exchange_symbol
        .strip_suffix(suffix)
        .ok_or_else(|| SymbolError::UnsupportedQuoteCurrency(exchange_symbol.to_string()))?;
    if !is_asset_code(base) {
        return Err(SymbolError::InvalidExchangeSymbol(exchange_symbol.to_string()));
    }
    UnifiedSymbol::perp(base, SUPPORTED_QUOTE)
        .map_err(|_| SymbolError::InvalidExchangeSymbol(exchange_symbol.to_string()))
}

/// Inverse of [`unwrap_with_suffix`].
///
/// Fails with `InvalidUnifiedSymbolFormat` for malformed input and with
/// `UnsupportedQuoteCurrency` when the quote is not USDT.
pub fn wrap_with_suffix(unified: &str, suffix: &str) -> SymbolResult<String> {
    let symbol = UnifiedSymbol::parse(unified)?;
    if symbol.quote() != SUPPORTED_QUOTE {
        return Err(SymbolError::UnsupportedQuoteCurrency(unified.to_string()));
    }
    Ok(format!("{}{}", symbol.base(), suffix))
}
