//! Payment Gateway Strategy Pattern
//!
//! The gateway is the only place where amounts travel in minor units. Every
//! type here mirrors the provider's wire shape; conversion to records happens
//! in the callers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shop_core::gateway::{OrderRequest, PaymentGateway};
//!
//! let order = gateway.create_order(&request).await?;
//! let payment = gateway.fetch_payment("pay_123").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Provider-side order creation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Amount in minor units
    pub amount: i64,

    /// ISO currency code
    pub currency: String,

    /// Merchant receipt token, unique per checkout
    pub receipt: String,

    /// 1 = capture automatically on authorization
    pub payment_capture: u8,

    /// Correlation data echoed back on the payment entity
    pub notes: OrderNotes,
}

/// Notes attached to a provider order. Values are strings on the wire, so
/// structured snapshots travel JSON-encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrderNotes {
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(rename = "userShipping", skip_serializing_if = "Option::is_none")]
    pub user_shipping: Option<String>,

    #[serde(rename = "cartItems", skip_serializing_if = "Option::is_none")]
    pub cart_items: Option<String>,
}

/// Order as returned by the provider
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,

    /// Amount in minor units
    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub receipt: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

/// Payment entity, as returned by a payment fetch and embedded in webhooks
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub order_id: Option<String>,

    /// Amount in minor units
    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "lenient_notes")]
    pub notes: PaymentNotes,
}

/// The notes we attach at checkout, as they come back on a payment
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotes {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,

    #[serde(rename = "userShipping", default)]
    pub user_shipping: Option<String>,

    #[serde(rename = "cartItems", default)]
    pub cart_items: Option<String>,
}

/// The provider sends `"notes": []` when a payment carries no notes, and
/// notes set by other integrations may not match our shape at all. Each key
/// is read on its own; non-string values are dropped.
fn lenient_notes<'de, D>(deserializer: D) -> std::result::Result<PaymentNotes, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Some(map) = value.as_object() else {
        return Ok(PaymentNotes::default());
    };
    let note = |key: &str| map.get(key).and_then(Value::as_str).map(ToString::to_string);

    Ok(PaymentNotes {
        user_id: note("userId"),
        user_shipping: note("userShipping"),
        cart_items: note("cartItems"),
    })
}

/// Payment gateway client trait (Strategy pattern)
///
/// Implement this for each provider. Implementations must bound every call
/// with a timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Public key id handed to the client checkout widget
    fn key_id(&self) -> &str;

    /// Create a provider-side order
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder>;

    /// Fetch a payment by id
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_request_wire_shape() {
        let request = OrderRequest {
            amount: 10_000,
            currency: "INR".into(),
            receipt: "receipt_1".into(),
            payment_capture: 1,
            notes: OrderNotes {
                user_id: Some("user_1".into()),
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["amount"], json!(10_000));
        assert_eq!(value["payment_capture"], json!(1));
        assert_eq!(value["notes"], json!({"userId": "user_1"}));
    }

    #[test]
    fn test_payment_with_notes() {
        let payment: GatewayPayment = serde_json::from_value(json!({
            "id": "pay_1",
            "entity": "payment",
            "order_id": "order_1",
            "amount": 10000,
            "currency": "INR",
            "status": "captured",
            "notes": {"userId": "user_1", "userShipping": "{\"city\":\"Pune\"}"}
        }))
        .unwrap();
        assert_eq!(payment.amount, Some(10_000));
        assert_eq!(payment.notes.user_id.as_deref(), Some("user_1"));
        assert_eq!(payment.notes.user_shipping.as_deref(), Some("{\"city\":\"Pune\"}"));
    }

    #[test]
    fn test_payment_with_empty_notes_array() {
        let payment: GatewayPayment = serde_json::from_value(json!({
            "id": "pay_2",
            "status": "failed",
            "notes": []
        }))
        .unwrap();
        assert_eq!(payment.notes, PaymentNotes::default());
        assert!(payment.order_id.is_none());
    }

    #[test]
    fn test_payment_with_foreign_notes() {
        let payment: GatewayPayment = serde_json::from_value(json!({
            "id": "pay_3",
            "notes": {"userId": 42, "userShipping": "{\"city\":\"Pune\"}", "cartItems": ["p1"]}
        }))
        .unwrap();
        assert!(payment.notes.user_id.is_none());
        assert!(payment.notes.cart_items.is_none());
        assert_eq!(payment.notes.user_shipping.as_deref(), Some("{\"city\":\"Pune\"}"));
    }

    #[test]
    fn test_payment_carries_cart_snapshot() {
        let payment: GatewayPayment = serde_json::from_value(json!({
            "id": "pay_4",
            "notes": {"userId": "user_1", "cartItems": "[{\"id\":\"p1\"}]"}
        }))
        .unwrap();
        assert_eq!(payment.notes.cart_items.as_deref(), Some("[{\"id\":\"p1\"}]"));
    }
}
