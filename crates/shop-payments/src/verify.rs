//! Payment Verification
//!
//! The client posts the (order id, payment id, signature) triple it got from
//! the checkout widget. The signature is recomputed locally; only a match
//! leads to a write.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use shop_core::gateway::{GatewayPayment, PaymentGateway};
use shop_core::record::{items_from_note, shipping_from_note, PayStatus, PaymentRecord};
use shop_core::{money, signature, PaymentStore};

use crate::config::PaymentConfig;
use crate::error::{PaymentError, Result};

const ORDER_ID: &str = "orderId";
const PAYMENT_ID: &str = "paymentId";
const SIGNATURE: &str = "signature";

/// Accepted spellings for each identity field, in precedence order. The
/// first non-empty string wins.
const FIELD_ALIASES: [(&str, &[&str]); 3] = [
    (ORDER_ID, &["orderId", "order_id", "razorpay_order_id"]),
    (PAYMENT_ID, &["paymentId", "payment_id", "razorpay_payment_id"]),
    (SIGNATURE, &["signature", "razorpay_signature"]),
];

/// Normalized confirmation payload
#[derive(Clone, Debug, PartialEq)]
pub struct VerifyRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,

    /// Client-reported amount in major units, when positive
    pub amount: Option<Decimal>,
    pub order_items: Option<Vec<Value>>,
    pub user_id: Option<String>,
    pub user_shipping: Option<Value>,
}

impl VerifyRequest {
    /// Normalize either naming convention into one shape
    pub fn from_json(payload: &Value) -> Result<Self> {
        let empty = Map::new();
        let body = payload.as_object().unwrap_or(&empty);

        let mut resolved: [Option<String>; 3] = Default::default();
        let mut missing = Vec::new();
        for (slot, (canonical, aliases)) in resolved.iter_mut().zip(FIELD_ALIASES) {
            *slot = aliases.iter().find_map(|key| non_empty_str(body.get(*key)));
            if slot.is_none() {
                missing.push(canonical);
            }
        }

        let [Some(order_id), Some(payment_id), Some(signature)] = resolved else {
            return Err(PaymentError::MissingFields(missing));
        };

        Ok(Self {
            order_id,
            payment_id,
            signature,
            amount: body.get("amount").and_then(money::parse_positive_amount),
            order_items: body
                .get("orderItems")
                .and_then(Value::as_array)
                .cloned(),
            user_id: non_empty_str(body.get("userId")),
            user_shipping: body.get("userShipping").filter(|v| v.is_object()).cloned(),
        })
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Outcome of a successful verification
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPayment {
    pub success: bool,
    pub message: &'static str,

    /// Record as stored
    pub record: PaymentRecord,

    /// Gateway view of the payment, when the enrichment fetch succeeded
    pub payment_details: Option<GatewayPayment>,

    /// False when a record for this payment already existed
    #[serde(skip)]
    pub created: bool,
}

/// Verifies client confirmations and records the payment
pub struct PaymentVerifier {
    config: Arc<PaymentConfig>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    store: Arc<dyn PaymentStore>,
}

impl PaymentVerifier {
    pub fn new(
        config: Arc<PaymentConfig>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        store: Arc<dyn PaymentStore>,
    ) -> Self {
        Self {
            config,
            gateway,
            store,
        }
    }

    /// Verify a confirmation payload and upsert the payment record
    pub async fn verify(&self, payload: &Value) -> Result<VerifiedPayment> {
        let request = VerifyRequest::from_json(payload)?;

        let secret = self.config.signing_secret().ok_or_else(|| {
            tracing::error!("Key secret missing; cannot verify payment signatures");
            PaymentError::ServerMisconfigured("key secret not set".into())
        })?;

        let expected = signature::payment_signature(secret, &request.order_id, &request.payment_id);
        if !signature::digests_match(&expected, &request.signature) {
            tracing::warn!(
                order_id = %request.order_id,
                payment_id = %request.payment_id,
                expected = %expected,
                received = %request.signature,
                "Payment signature mismatch"
            );
            return Err(PaymentError::SignatureMismatch);
        }

        let details = self.fetch_details(&request.payment_id).await;
        let record = build_record(request, details.as_ref());
        let reported = record.pay_status.clone();

        let upserted = self
            .store
            .upsert_by_payment_id(record, Some(reported))
            .await?;

        tracing::info!(
            order_id = %upserted.record.order_id,
            payment_id = ?upserted.record.payment_id,
            status = %upserted.record.pay_status,
            created = upserted.created,
            "Payment verified"
        );

        Ok(VerifiedPayment {
            success: true,
            message: "Payment verified and saved",
            record: upserted.record,
            payment_details: details,
            created: upserted.created,
        })
    }

    /// Best-effort gateway lookup. Never fails the verification.
    async fn fetch_details(&self, payment_id: &str) -> Option<GatewayPayment> {
        let gateway = self.gateway.as_ref()?;

        match tokio::time::timeout(self.config.timeout(), gateway.fetch_payment(payment_id)).await {
            Ok(Ok(payment)) => Some(payment),
            Ok(Err(e)) => {
                tracing::warn!(payment_id, error = %e, "Could not fetch payment details");
                None
            }
            Err(_) => {
                tracing::warn!(payment_id, "Timed out fetching payment details");
                None
            }
        }
    }
}

/// Client values first, gateway values second.
fn build_record(request: VerifyRequest, details: Option<&GatewayPayment>) -> PaymentRecord {
    let gateway_amount = details
        .and_then(|d| d.amount)
        .map(money::to_major)
        .filter(|a| *a > Decimal::ZERO);

    let amount = request.amount.or(gateway_amount).unwrap_or_else(|| {
        tracing::warn!(
            payment_id = %request.payment_id,
            "No amount from client or gateway; recording zero"
        );
        Decimal::ZERO
    });

    let mut record = PaymentRecord::new(request.order_id, amount);
    record.payment_id = Some(request.payment_id);
    record.signature = Some(request.signature);
    record.order_items = request.order_items.unwrap_or_else(|| {
        items_from_note(details.and_then(|d| d.notes.cart_items.as_deref()))
    });
    record.user_id = request
        .user_id
        .or_else(|| details.and_then(|d| d.notes.user_id.clone()));
    record.user_shipping = request.user_shipping.unwrap_or_else(|| {
        shipping_from_note(details.and_then(|d| d.notes.user_shipping.as_deref()))
    });
    record.pay_status = details
        .and_then(|d| d.status.as_deref())
        .map_or(PayStatus::Paid, PayStatus::from);
    record
}
