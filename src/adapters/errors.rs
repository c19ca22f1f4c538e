//! Exchange adapter error types
//!
//! All exchange-related errors are wrapped in ExchangeError enum
//! which implements thiserror for consistent error handling.

use thiserror::Error;

use crate::core::symbol::SymbolError;

/// Exchange-specific error types for adapter operations
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Connection to exchange failed (DNS, TLS, reset...)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Exchange answered with a non-success HTTP status
    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Exchange answered 200 but flagged the request as failed
    #[error("API rejected request to {url} (code {code})")]
    ApiRejected { url: String, code: i64 },

    /// Network operation timed out
    #[error("Network timeout after {0}ms")]
    NetworkTimeout(u64),

    /// Invalid or unexpected response from exchange
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Symbol could not be mapped
    #[error("Symbol error: {0}")]
    Symbol(#[from] SymbolError),

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ExchangeError::WebSocket(Box::new(err))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest doesn't expose the elapsed time, report the configured budget
            ExchangeError::NetworkTimeout(crate::config::constants::http_timeout().as_millis() as u64)
        } else if err.is_decode() {
            ExchangeError::InvalidResponse(err.to_string())
        } else {
            ExchangeError::ConnectionFailed(err.to_string())
        }
    }
}

/// Result type alias for exchange operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
