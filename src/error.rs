//! Application-wide error types using thiserror
//!
//! Symbol, serialization and IO errors convert into AppError via `#[from]`,
//! so the config, snapshot and sink layers can use `?` across module seams.

use thiserror::Error;

use crate::core::symbol::SymbolError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Symbol error: {0}")]
    Symbol(#[from] SymbolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Result sink could not publish a cycle
    #[error("Sink error: {0}")]
    Sink(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
