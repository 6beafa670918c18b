//! Error types for the shieldpay library.
//!
//! This module defines the errors that can surface from configuration, the
//! settlement collaborators and the resource client. The payment gate itself
//! never lets these escape; it converts them into HTTP responses (see
//! [`crate::server::PaygateError`]).

use thiserror::Error;

/// Main error type for shieldpay operations.
#[derive(Error, Debug)]
pub enum ShieldPayError {
    /// Error during HTTP request/response handling
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error during Base64 encoding/decoding
    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// Error parsing URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Error reading a configuration file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A route key was not of the form `<METHOD> <path>`
    #[error("Invalid route key: {0}")]
    InvalidRouteKey(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The settlement receipt header could not be decoded
    #[error("Invalid settlement receipt: {0}")]
    InvalidReceipt(String),

    /// The facilitator answered with a non-success status
    #[error("Facilitator returned {status}: {body}")]
    FacilitatorStatus {
        /// HTTP status returned by the facilitator
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Payment settlement failed
    #[error("{0}")]
    SettlementError(String),

    /// Unsupported network
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Missing required environment variable
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for shieldpay operations.
pub type Result<T> = std::result::Result<T, ShieldPayError>;
