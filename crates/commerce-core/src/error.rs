//! # Commerce Error Types
//!
//! Typed error handling for gateway and shipping operations.
//! Internal helpers return `Result<T, PaymentError>`; the public strategy and
//! manager operations fold these errors into their structured outcomes.

use crate::config::ConfigError;
use thiserror::Error;

/// Core error type for gateway and shipping operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No gateway registered under this name
    #[error("Payment gateway not found: {name}")]
    GatewayNotFound { name: String },

    /// No shipping method registered under this name
    #[error("Shipping method not found: {name}")]
    ShippingMethodNotFound { name: String },

    /// Gateway exists but is switched off
    #[error("Payment gateway is not enabled: {name}")]
    GatewayDisabled { name: String },

    /// Shipping method exists but is switched off
    #[error("Shipping method is not enabled: {name}")]
    ShippingMethodDisabled { name: String },

    /// Missing or malformed strategy configuration
    #[error("Invalid configuration: {}", join_errors(.0))]
    InvalidConfiguration(Vec<ConfigError>),

    /// Network/HTTP transport error communicating with a provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider answered but rejected the request
    #[error("{message}")]
    ProviderError { provider: String, message: String },

    /// Could not obtain credentials from the provider
    #[error("Failed to authenticate with {provider}")]
    Authentication { provider: String },

    /// Business-rule limit (weight, value) exceeded
    #[error("{0}")]
    LimitExceeded(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Config store read/write failure
    #[error("Config store error: {0}")]
    Store(String),

    /// Process configuration errors (client construction, env)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_)
                | PaymentError::ProviderError { .. }
                | PaymentError::Authentication { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::GatewayNotFound { .. } => 404,
            PaymentError::ShippingMethodNotFound { .. } => 404,
            PaymentError::GatewayDisabled { .. } => 409,
            PaymentError::ShippingMethodDisabled { .. } => 409,
            PaymentError::InvalidConfiguration(_) => 422,
            PaymentError::NetworkError(_) => 503,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::Authentication { .. } => 502,
            PaymentError::LimitExceeded(_) => 422,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::Serialization(_) => 500,
            PaymentError::Store(_) => 500,
            PaymentError::Configuration(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type alias for gateway and shipping operations
pub type PaymentResult<T> = Result<T, PaymentError>;
