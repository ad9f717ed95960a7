//! Storefront payment HTTP server
//!
//! Axum router over the payment components. The binary in `main.rs` builds
//! the state from the environment; tests build it by hand.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    all_orders, create_checkout, health_check, razorpay_webhook, user_orders, verify_payment,
};
use crate::state::AppState;

/// Payment routes, mounted under `/api/payment`
fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/verify-payment", post(verify_payment))
        .route("/webhook", post(razorpay_webhook))
        .route("/userorder", get(user_orders))
        .route("/orders", get(all_orders))
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/payment", payment_routes())
        .with_state(state)
}
