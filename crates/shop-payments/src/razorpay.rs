//! Razorpay Gateway
//!
//! Implementation of `PaymentGateway` over the Razorpay REST API (basic auth
//! with the key id and secret, JSON bodies, minor-unit amounts).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;

use shop_core::gateway::{GatewayOrder, GatewayPayment, OrderRequest, PaymentGateway};
use shop_core::CoreError;

use crate::config::PaymentConfig;
use crate::error::{PaymentError, Result};

/// Longest gateway error text we carry into logs
const MAX_ERROR_LEN: usize = 200;

/// Razorpay REST client
pub struct RazorpayGateway {
    client: Client,
    base_url: Url,
    key_id: String,
    key_secret: SecretString,
    timeout: Duration,
}

impl RazorpayGateway {
    /// Create a new Razorpay client
    pub fn new(
        base_url: &str,
        key_id: impl Into<String>,
        key_secret: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            PaymentError::ServerMisconfigured(format!("invalid gateway base URL {base_url}: {e}"))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::GatewayUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            key_id: key_id.into(),
            key_secret,
            timeout,
        })
    }

    /// Create from payment configuration
    pub fn from_config(config: &PaymentConfig) -> Result<Self> {
        let (key_id, key_secret) = config
            .credentials()
            .ok_or(PaymentError::ProviderNotConfigured)?;

        Self::new(
            &config.api_base,
            key_id,
            SecretString::new(key_secret.to_string()),
            config.timeout(),
        )
    }

    /// Build an endpoint URL; every segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> shop_core::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::GatewayUnavailable(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> shop_core::Result<T> {
        let response = request
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::GatewayRejected {
                status: status.as_u16(),
                message: error_description(&body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CoreError::GatewayResponse(e.to_string()))
    }

    fn transport_error(&self, err: &reqwest::Error) -> CoreError {
        if err.is_timeout() {
            CoreError::GatewayTimeout(self.timeout.as_secs())
        } else {
            CoreError::GatewayUnavailable(err.to_string())
        }
    }
}

/// Pull the human-readable description out of a Razorpay error body,
/// falling back to the (truncated) raw body.
fn error_description(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/description")
                .and_then(|d| d.as_str())
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_LEN).collect())
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &str {
        "razorpay"
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: &OrderRequest) -> shop_core::Result<GatewayOrder> {
        let url = self.endpoint(&["v1", "orders"])?;
        tracing::debug!(receipt = %request.receipt, amount = request.amount, "Creating Razorpay order");
        self.send(self.client.post(url).json(request)).await
    }

    async fn fetch_payment(&self, payment_id: &str) -> shop_core::Result<GatewayPayment> {
        let url = self.endpoint(&["v1", "payments", payment_id])?;
        self.send(self.client.get(url)).await
    }
}
