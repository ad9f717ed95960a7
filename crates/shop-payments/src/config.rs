//! Payment Configuration
//!
//! Built once at startup and shared read-only. Missing credentials are not an
//! error here: checkout and verification report them per request.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Default gateway API base URL
pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

/// Default order currency
pub const DEFAULT_CURRENCY: &str = "INR";

/// Default gateway call timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Payment gateway configuration
#[derive(Debug)]
pub struct PaymentConfig {
    /// Public key id (safe to hand to clients)
    pub key_id: Option<String>,

    /// API key secret, also the checkout signing secret
    pub key_secret: Option<SecretString>,

    /// Dedicated webhook signing secret
    pub webhook_secret: Option<SecretString>,

    /// Gateway API base URL
    pub api_base: String,

    /// Currency for every order
    pub currency: String,

    /// Bound on every gateway call
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            key_secret: None,
            webhook_secret: None,
            api_base: DEFAULT_API_BASE.into(),
            currency: DEFAULT_CURRENCY.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PaymentConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        };

        let defaults = Self::default();
        Self {
            key_id: get(&["RAZORPAY_KEY_ID", "RZP_KEY_ID"]),
            key_secret: get(&["RAZORPAY_KEY_SECRET", "RZP_KEY_SECRET"]).map(SecretString::new),
            webhook_secret: get(&["RAZORPAY_WEBHOOK_SECRET"]).map(SecretString::new),
            api_base: get(&["RAZORPAY_API_BASE"])
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            currency: get(&["PAYMENT_CURRENCY"])
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(defaults.currency),
            timeout_secs: get(&["RAZORPAY_TIMEOUT_SECS"])
                .and_then(|t| t.trim().parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// Key id and secret, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.key_id, &self.key_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.expose_secret().as_str())),
            _ => None,
        }
    }

    /// Secret used to sign checkout confirmations
    pub fn signing_secret(&self) -> Option<&str> {
        self.key_secret.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Secret used to sign webhook deliveries, falling back to the key secret
    pub fn webhook_signing_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_ref()
            .or(self.key_secret.as_ref())
            .map(|s| s.expose_secret().as_str())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
