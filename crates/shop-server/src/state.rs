//! Application State

use std::sync::Arc;

use shop_core::PaymentStore;
use shop_payments::{CheckoutInitiator, PaymentVerifier, WebhookReconciler};

use crate::auth::SessionValidator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Creates provider orders
    pub checkout: Arc<CheckoutInitiator>,

    /// Verifies client payment confirmations
    pub verifier: Arc<PaymentVerifier>,

    /// Authenticates and applies gateway webhooks
    pub webhooks: Arc<WebhookReconciler>,

    /// Payment records, for the listing routes
    pub store: Arc<dyn PaymentStore>,

    /// Session token validation
    pub sessions: Arc<dyn SessionValidator>,
}
