//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use shop_core::{CoreError, PaymentRecord};
use shop_payments::{CheckoutRequest, CheckoutSession, PaymentError, VerifiedPayment, SIGNATURE_HEADER};

use crate::auth::{RequireAdmin, RequireAuth};
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
    pub store: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<PaymentRecord>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
            code: code.into(),
        }),
    )
}

/// Client errors carry their detail; server errors only the generic message
fn payment_error(err: &PaymentError) -> ApiError {
    if err.is_client_error() {
        tracing::warn!(code = err.code(), "Payment request rejected: {}", err);
        api_error(StatusCode::BAD_REQUEST, err.to_string(), err.code())
    } else {
        tracing::error!(code = err.code(), "Payment request failed: {}", err);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, err.user_message(), err.code())
    }
}

fn invalid_json(rejection: &JsonRejection) -> ApiError {
    tracing::warn!("Malformed request body: {}", rejection.body_text());
    api_error(StatusCode::BAD_REQUEST, "Invalid JSON body", "INVALID_JSON")
}

fn storage_error(err: &CoreError) -> ApiError {
    tracing::error!("Order listing failed: {}", err);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Could not load orders",
        "STORAGE_ERROR",
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.checkout.is_configured(),
        store: state.store.backend(),
    })
}

/// Create a provider order for the cart
pub async fn create_checkout(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let Json(request) = payload.map_err(|e| invalid_json(&e))?;

    let session = state
        .checkout
        .create_order(request)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(session))
}

/// Verify a client payment confirmation and record the payment
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<VerifiedPayment>, ApiError> {
    let Json(body) = payload.map_err(|e| invalid_json(&e))?;

    let verified = state
        .verifier
        .verify(&body)
        .await
        .map_err(|e| payment_error(&e))?;

    Ok(Json(verified))
}

/// Razorpay webhook. Takes the body as raw bytes: the signature covers the
/// exact bytes sent.
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.webhooks.reconcile(&body, signature).await {
        Ok(_) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(rejection) => (StatusCode::BAD_REQUEST, rejection.to_string()).into_response(),
    }
}

/// Orders of the signed-in user, newest first
pub async fn user_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state
        .store
        .list_for_user(&user.user_id)
        .await
        .map_err(|e| storage_error(&e))?;

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// Every order, newest first
pub async fn all_orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state.store.list_all().await.map_err(|e| storage_error(&e))?;
    tracing::debug!(admin = %admin.user_id, count = orders.len(), "Listed all orders");

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}
