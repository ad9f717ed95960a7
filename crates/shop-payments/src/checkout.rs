//! Checkout
//!
//! Validates the requested charge and creates a provider-side order. Nothing
//! is stored locally: until the payment is confirmed, the order notes on the
//! gateway are the only copy of the cart.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use shop_core::gateway::{GatewayOrder, OrderNotes, OrderRequest, PaymentGateway};
use shop_core::money;

use crate::error::{PaymentError, Result};

/// Request to start a checkout
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Amount in major units, as a JSON number or numeric string
    #[serde(default)]
    pub amount: Option<Value>,

    #[serde(default)]
    pub cart_items: Option<Value>,

    #[serde(default)]
    pub user_shipping: Option<Value>,

    /// Only a non-empty string is forwarded to the gateway notes
    #[serde(default)]
    pub user_id: Option<Value>,
}

/// Order metadata handed back to the client checkout widget
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub success: bool,

    /// Provider order id
    pub order_id: String,

    /// Amount in major units
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    pub currency: String,

    /// Public key id for the client widget
    pub key: String,

    /// Order as returned by the provider
    pub order: GatewayOrder,
}

/// Creates provider orders for checkouts
pub struct CheckoutInitiator {
    gateway: Option<Arc<dyn PaymentGateway>>,
    currency: String,
}

impl CheckoutInitiator {
    pub fn new(gateway: Option<Arc<dyn PaymentGateway>>, currency: impl Into<String>) -> Self {
        Self {
            gateway,
            currency: currency.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    /// Validate the amount and create the provider order
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let amount = request
            .amount
            .as_ref()
            .and_then(money::parse_positive_amount)
            .ok_or_else(|| {
                PaymentError::InvalidAmount(
                    request
                        .amount
                        .as_ref()
                        .map_or_else(|| "missing".to_string(), ToString::to_string),
                )
            })?;

        let amount_minor = money::to_minor(amount)
            .filter(|minor| *minor > 0)
            .ok_or_else(|| PaymentError::InvalidAmount(amount.to_string()))?;

        let gateway = self
            .gateway
            .as_ref()
            .ok_or(PaymentError::ProviderNotConfigured)?;

        let order_request = OrderRequest {
            amount: amount_minor,
            currency: self.currency.clone(),
            receipt: receipt_token(),
            payment_capture: 1,
            notes: OrderNotes {
                user_id: request
                    .user_id
                    .as_ref()
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(ToString::to_string),
                user_shipping: request.user_shipping.as_ref().map(Value::to_string),
                cart_items: request.cart_items.as_ref().map(Value::to_string),
            },
        };

        let order = gateway.create_order(&order_request).await.map_err(|e| {
            tracing::error!(
                gateway = gateway.name(),
                receipt = %order_request.receipt,
                error = %e,
                "Order creation failed"
            );
            PaymentError::from(e)
        })?;

        tracing::info!(
            order_id = %order.id,
            amount_minor,
            currency = %order_request.currency,
            receipt = %order_request.receipt,
            "Created checkout order"
        );

        Ok(CheckoutSession {
            success: true,
            order_id: order.id.clone(),
            amount: money::to_major(order.amount.unwrap_or(amount_minor)),
            currency: order
                .currency
                .clone()
                .unwrap_or_else(|| order_request.currency.clone()),
            key: gateway.key_id().to_string(),
            order,
        })
    }
}

/// Unique per checkout: millisecond timestamp plus a random suffix, well
/// under the provider's 40 character receipt limit.
fn receipt_token() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("receipt_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}
