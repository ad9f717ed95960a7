//! Error Types

use thiserror::Error;

/// Result type alias for store and gateway operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the payment store and gateway adapters
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence backend failed
    #[error("Store error: {0}")]
    Store(String),

    /// Gateway could not be reached
    #[error("Gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Gateway did not answer in time
    #[error("Gateway timed out after {0}s")]
    GatewayTimeout(u64),

    /// Gateway answered with a non-success status
    #[error("Gateway rejected request ({status}): {message}")]
    GatewayRejected { status: u16, message: String },

    /// Gateway answered with a body we could not decode
    #[error("Gateway response invalid: {0}")]
    GatewayResponse(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Store(_) | CoreError::GatewayUnavailable(_) | CoreError::GatewayTimeout(_)
        ) || matches!(self, CoreError::GatewayRejected { status, .. } if *status >= 500)
    }

    /// Whether the failure originated at the payment gateway
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            CoreError::GatewayUnavailable(_)
                | CoreError::GatewayTimeout(_)
                | CoreError::GatewayRejected { .. }
                | CoreError::GatewayResponse(_)
        )
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Store(err.to_string())
    }
}
