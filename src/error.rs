//! Error types for the Bitpanda wallet integration

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when fetching data from the Bitpanda API
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport-level failure (connection, timeout, body read)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Creates an HttpStatus error
    pub fn http_status(endpoint: &str, status: u16) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.to_string(),
            status,
        }
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl From<HttpError> for ProviderError {
    fn from(err: HttpError) -> Self {
        Self::NetworkError(err.message().to_string())
    }
}

/// Transient poll failure
///
/// Hosts treat this as "data stale, retry next tick": last known values stay
/// visible and nothing but the next update timestamp changes.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct UpdateFailed {
    message: String,
}

impl UpdateFailed {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ProviderError> for UpdateFailed {
    fn from(err: ProviderError) -> Self {
        Self::new(format!("Error fetching wallet data: {err}"))
    }
}

/// Errors raised while validating user input or building a config entry
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The API key was rejected or could not be checked
    #[error("Invalid API key")]
    InvalidApiKey,

    /// No API key was entered
    #[error("API key is required")]
    MissingApiKey,

    /// The wallet selection is empty
    #[error("At least one wallet type must be selected")]
    NoWalletTypes,

    /// A selected wallet type is not one of the supported types
    #[error("Unsupported wallet type: {0}")]
    UnsupportedWalletType(String),

    /// Unknown fiat currency code
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Entry data could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ConfigError {
    /// Form error key shown by the host's configuration UI
    pub fn form_error_key(&self) -> &'static str {
        match self {
            ConfigError::InvalidApiKey => "invalid_api_key",
            ConfigError::MissingApiKey => "missing_api_key",
            ConfigError::NoWalletTypes => "no_wallet_types",
            ConfigError::UnsupportedWalletType(_) => "unsupported_wallet_type",
            ConfigError::UnsupportedCurrency(_) => "unsupported_currency",
            ConfigError::Serialization(_) => "unknown",
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors surfaced by integration setup
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    /// First refresh failed; the host should retry setup later
    #[error("No data received from Bitpanda API: {0}")]
    NotReady(#[from] UpdateFailed),
}
