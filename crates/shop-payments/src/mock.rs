//! Mock Gateway
//!
//! For testing and local runs. Creates orders in memory, serves payments that
//! were registered up front, and can be switched offline.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use shop_core::gateway::{GatewayOrder, GatewayPayment, OrderRequest, PaymentGateway};
use shop_core::CoreError;

/// In-memory stand-in for the payment provider
pub struct MockGateway {
    key_id: String,
    orders: Mutex<Vec<OrderRequest>>,
    payments: Mutex<HashMap<String, GatewayPayment>>,
    offline: AtomicBool,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::with_key_id("rzp_test_mock")
    }

    pub fn with_key_id(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            orders: Mutex::new(Vec::new()),
            payments: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make a payment fetchable
    pub async fn register_payment(&self, payment: GatewayPayment) {
        self.payments
            .lock()
            .await
            .insert(payment.id.clone(), payment);
    }

    /// Fail every call while offline
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Order requests received so far, in arrival order
    pub async fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().await.clone()
    }

    fn check_online(&self) -> shop_core::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::GatewayUnavailable("mock gateway offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: &OrderRequest) -> shop_core::Result<GatewayOrder> {
        self.check_online()?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let order = GatewayOrder {
            id: format!("order_{}", &id[..14]),
            amount: Some(request.amount),
            currency: Some(request.currency.clone()),
            receipt: Some(request.receipt.clone()),
            status: Some("created".into()),
        };

        self.orders.lock().await.push(request.clone());
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> shop_core::Result<GatewayPayment> {
        self.check_online()?;

        self.payments
            .lock()
            .await
            .get(payment_id)
            .cloned()
            .ok_or_else(|| CoreError::GatewayRejected {
                status: 400,
                message: "The id provided does not exist".into(),
            })
    }
}
