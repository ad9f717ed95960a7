//! Payment Error Types

use shop_core::CoreError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Requested amount is missing, not a finite number, or not positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Confirmation payload lacks order id, payment id or signature
    #[error("Missing required payment fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Gateway credentials are absent
    #[error("Payment provider not configured")]
    ProviderNotConfigured,

    /// A secret needed locally is absent
    #[error("Server not configured for payments: {0}")]
    ServerMisconfigured(String),

    /// Submitted signature does not match the computed one
    #[error("Invalid signature")]
    SignatureMismatch,

    /// Gateway call failed
    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(#[source] CoreError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[source] CoreError),
}

impl From<CoreError> for PaymentError {
    fn from(err: CoreError) -> Self {
        if err.is_gateway() {
            PaymentError::ProviderUnavailable(err)
        } else {
            PaymentError::Storage(err)
        }
    }
}

impl PaymentError {
    /// Whether the caller sent something wrong (as opposed to us failing)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaymentError::InvalidAmount(_)
                | PaymentError::MissingFields(_)
                | PaymentError::SignatureMismatch
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::ProviderUnavailable(e) | PaymentError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::InvalidAmount(_) => "INVALID_AMOUNT",
            PaymentError::MissingFields(_) => "MISSING_FIELDS",
            PaymentError::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            PaymentError::ServerMisconfigured(_) => "SERVER_MISCONFIGURED",
            PaymentError::SignatureMismatch => "SIGNATURE_MISMATCH",
            PaymentError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            PaymentError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::InvalidAmount(_) => "Invalid amount",
            PaymentError::MissingFields(_) => "Missing required payment fields",
            PaymentError::ProviderNotConfigured => "Payment provider not configured",
            PaymentError::ServerMisconfigured(_) => "Server not configured for payments",
            PaymentError::SignatureMismatch => "Invalid signature",
            PaymentError::ProviderUnavailable(_) => "Payment provider unavailable. Please try again.",
            PaymentError::Storage(_) => "Could not save payment. Please contact support.",
        }
    }
}
