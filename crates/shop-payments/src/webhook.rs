//! Razorpay Webhook Handling
//!
//! Authenticates provider-pushed events over the raw request bytes and
//! reconciles payment events into the record store.
//!
//! Once the signature checks out the provider always gets an acknowledgment:
//! unparseable bodies, unknown events and store failures are logged, never
//! returned, so deliveries are not retried forever.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use shop_core::gateway::GatewayPayment;
use shop_core::record::{items_from_note, shipping_from_note, PayStatus, PaymentRecord};
use shop_core::{money, signature, PaymentStore};

use crate::config::PaymentConfig;

/// Header carrying the hex HMAC-SHA256 of the raw body
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Reasons a delivery is refused before anything is processed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookRejection {
    #[error("missing body")]
    EmptyBody,

    #[error("webhook secret not configured")]
    SecretNotConfigured,

    #[error("invalid signature")]
    MissingSignature,

    #[error("invalid signature")]
    SignatureMismatch,
}

/// Payment event kinds we act on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentEventKind {
    Captured,
    Authorized,
    Failed,
}

impl PaymentEventKind {
    fn from_event(event: &str) -> Option<Self> {
        match event {
            "payment.captured" => Some(Self::Captured),
            "payment.authorized" => Some(Self::Authorized),
            "payment.failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Status implied by the event when the entity carries none
    pub fn implied_status(self) -> PayStatus {
        match self {
            Self::Captured => PayStatus::Captured,
            Self::Authorized => PayStatus::Authorized,
            Self::Failed => PayStatus::Failed,
        }
    }
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq)]
pub enum WebhookEvent {
    /// Payment lifecycle event with its entity
    Payment {
        kind: PaymentEventKind,
        entity: GatewayPayment,
    },

    /// Payment event whose entity lacks an id or order id
    Incomplete { event_type: String },

    /// Unhandled event type
    Other { event_type: String },

    /// Signed body that is not the JSON we expect
    Unparseable,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    event: String,

    #[serde(default)]
    payload: Value,
}

impl WebhookEvent {
    /// Parse an authenticated body
    pub fn parse(body: &[u8]) -> Self {
        let Ok(envelope) = serde_json::from_slice::<Envelope>(body) else {
            return Self::Unparseable;
        };

        let Some(kind) = PaymentEventKind::from_event(&envelope.event) else {
            return Self::Other {
                event_type: envelope.event,
            };
        };

        let entity = envelope
            .payload
            .pointer("/payment/entity")
            .cloned()
            .and_then(|v| serde_json::from_value::<GatewayPayment>(v).ok())
            .filter(|e| !e.id.is_empty() && e.order_id.as_deref().is_some_and(|o| !o.is_empty()));

        match entity {
            Some(entity) => Self::Payment { kind, entity },
            None => Self::Incomplete {
                event_type: envelope.event,
            },
        }
    }
}

/// What an accepted delivery did
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookOutcome {
    pub event: WebhookEvent,

    /// Stored record after reconciliation, if there was a write
    pub record: Option<PaymentRecord>,

    /// Whether the write inserted a new record
    pub created: bool,
}

impl WebhookOutcome {
    fn ignored(event: WebhookEvent) -> Self {
        Self {
            event,
            record: None,
            created: false,
        }
    }
}

/// Webhook handler
pub struct WebhookReconciler {
    config: Arc<PaymentConfig>,
    store: Arc<dyn PaymentStore>,
}

impl WebhookReconciler {
    pub fn new(config: Arc<PaymentConfig>, store: Arc<dyn PaymentStore>) -> Self {
        Self { config, store }
    }

    /// Check the signature over the exact bytes received
    pub fn authenticate(
        &self,
        body: &[u8],
        supplied: Option<&str>,
    ) -> Result<String, WebhookRejection> {
        if body.is_empty() {
            return Err(WebhookRejection::EmptyBody);
        }

        let secret = self.config.webhook_signing_secret().ok_or_else(|| {
            tracing::error!("Webhook secret missing; rejecting delivery");
            WebhookRejection::SecretNotConfigured
        })?;

        let supplied = supplied
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                tracing::warn!("Webhook delivery without {SIGNATURE_HEADER} header");
                WebhookRejection::MissingSignature
            })?;

        let expected = signature::webhook_signature(secret, body);
        if !signature::digests_match(&expected, supplied) {
            tracing::warn!(
                expected = %expected,
                received = %supplied,
                body_len = body.len(),
                "Webhook signature mismatch"
            );
            return Err(WebhookRejection::SignatureMismatch);
        }

        Ok(expected)
    }

    /// Authenticate and process a delivery
    pub async fn reconcile(
        &self,
        body: &[u8],
        supplied: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookRejection> {
        let digest = self.authenticate(body, supplied)?;

        let event = WebhookEvent::parse(body);
        match &event {
            WebhookEvent::Payment { kind, entity } => {
                return Ok(self.apply(*kind, entity, digest, &event).await);
            }
            WebhookEvent::Incomplete { event_type } => {
                tracing::warn!(event = %event_type, "Payment event without id or order id");
            }
            WebhookEvent::Other { event_type } => {
                tracing::debug!(event = %event_type, "Unhandled webhook event");
            }
            WebhookEvent::Unparseable => {
                tracing::warn!(body_len = body.len(), "Signed webhook body is not valid JSON");
            }
        }

        Ok(WebhookOutcome::ignored(event))
    }

    async fn apply(
        &self,
        kind: PaymentEventKind,
        entity: &GatewayPayment,
        digest: String,
        event: &WebhookEvent,
    ) -> WebhookOutcome {
        let reported = entity.status.as_deref().map(PayStatus::from);
        let record = record_from_entity(kind, entity, digest);

        match self.store.upsert_by_payment_id(record, reported).await {
            Ok(upserted) => {
                tracing::info!(
                    payment_id = %entity.id,
                    order_id = ?entity.order_id,
                    status = %upserted.record.pay_status,
                    created = upserted.created,
                    "Reconciled payment from webhook"
                );
                WebhookOutcome {
                    event: event.clone(),
                    created: upserted.created,
                    record: Some(upserted.record),
                }
            }
            Err(e) => {
                tracing::error!(
                    payment_id = %entity.id,
                    error = %e,
                    "Could not store webhook payment; acknowledging anyway"
                );
                WebhookOutcome::ignored(event.clone())
            }
        }
    }
}

/// Record inserted when the payment is not known yet
fn record_from_entity(kind: PaymentEventKind, entity: &GatewayPayment, digest: String) -> PaymentRecord {
    let amount = money::to_major(entity.amount.unwrap_or_default());

    let mut record = PaymentRecord::new(entity.order_id.clone().unwrap_or_default(), amount);
    record.payment_id = Some(entity.id.clone());
    record.signature = Some(digest);
    record.user_id = entity.notes.user_id.clone().filter(|id| !id.is_empty());
    record.user_shipping = shipping_from_note(entity.notes.user_shipping.as_deref());
    record.order_items = items_from_note(entity.notes.cart_items.as_deref());
    record.pay_status = entity
        .status
        .as_deref()
        .map_or_else(|| kind.implied_status(), PayStatus::from);
    record
}
