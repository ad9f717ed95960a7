//! # shop-payments
//!
//! Checkout, payment verification and webhook reconciliation for the
//! storefront backend.
//!
//! ## Payment Flow
//!
//! ```text
//! ┌──────────┐  checkout   ┌─────────────┐   create order   ┌───────────┐
//! │  Client  │────────────▶│  Checkout   │─────────────────▶│           │
//! │          │             │  Initiator  │                  │           │
//! │          │             └─────────────┘                  │           │
//! │          │◀───────── order id + key ──────────────────  │           │
//! │          │                                              │  Gateway  │
//! │          │──── pays in provider widget ────────────────▶│           │
//! │          │                                              │           │
//! │          │   verify    ┌─────────────┐  fetch payment   │           │
//! │          │────────────▶│  Payment    │─────────────────▶│           │
//! └──────────┘             │  Verifier   │                  └─────┬─────┘
//!                          └──────┬──────┘                        │ webhook
//!                                 │ upsert by paymentId   ┌───────▼───────┐
//!                                 ▼                       │   Webhook     │
//!                          ┌─────────────┐◀───────────────│  Reconciler   │
//!                          │   Record    │ upsert by      └───────────────┘
//!                          │   Store     │ paymentId
//!                          └─────────────┘
//! ```
//!
//! Verification and webhook delivery may arrive in either order, or both
//! more than once. Both write through the store's atomic upsert, so a payment
//! ends up as exactly one record.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shop_payments::{CheckoutInitiator, PaymentConfig, RazorpayGateway};
//!
//! let config = Arc::new(PaymentConfig::from_env());
//! let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayGateway::from_config(&config)?);
//!
//! let checkout = CheckoutInitiator::new(Some(gateway), config.currency.clone());
//! let session = checkout.create_order(request).await?;
//!
//! // Hand session.order_id and session.key to the client widget
//! ```

mod checkout;
mod config;
mod error;
pub mod mock;
mod razorpay;
mod verify;
mod webhook;

pub use checkout::{CheckoutInitiator, CheckoutRequest, CheckoutSession};
pub use config::{PaymentConfig, DEFAULT_API_BASE, DEFAULT_CURRENCY, DEFAULT_TIMEOUT_SECS};
pub use error::{PaymentError, Result};
pub use mock::MockGateway;
pub use razorpay::RazorpayGateway;
pub use verify::{PaymentVerifier, VerifiedPayment, VerifyRequest};
pub use webhook::{
    PaymentEventKind, WebhookEvent, WebhookOutcome, WebhookReconciler, WebhookRejection,
    SIGNATURE_HEADER,
};
