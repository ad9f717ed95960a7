//! End-to-end payment flow over the HTTP router, with the mock gateway and
//! the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use shop_core::{signature, MemoryPaymentStore, PayStatus, PaymentGateway, PaymentStore};
use shop_payments::{
    CheckoutInitiator, MockGateway, PaymentConfig, PaymentVerifier, WebhookReconciler,
    SIGNATURE_HEADER,
};
use shop_server::{
    app,
    auth::{Claims, JwtSessionValidator, RejectAllValidator, SessionValidator},
    state::AppState,
};

const KEY_SECRET: &str = "test_key_secret";
const HOOK_SECRET: &str = "test_webhook_secret";
const JWT_SECRET: &[u8] = b"test_jwt_secret";

struct TestApp {
    router: Router,
    gateway: Arc<MockGateway>,
    store: Arc<MemoryPaymentStore>,
}

fn build(configured: bool, sessions: Arc<dyn SessionValidator>) -> TestApp {
    let config = Arc::new(PaymentConfig {
        key_id: Some("rzp_test_mock".into()),
        key_secret: configured.then(|| SecretString::new(KEY_SECRET.into())),
        webhook_secret: configured.then(|| SecretString::new(HOOK_SECRET.into())),
        ..Default::default()
    });
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(MemoryPaymentStore::new());
    let dyn_gateway: Option<Arc<dyn PaymentGateway>> =
        configured.then(|| gateway.clone() as Arc<dyn PaymentGateway>);

    let state = AppState {
        checkout: Arc::new(CheckoutInitiator::new(dyn_gateway.clone(), "INR")),
        verifier: Arc::new(PaymentVerifier::new(config.clone(), dyn_gateway, store.clone())),
        webhooks: Arc::new(WebhookReconciler::new(config, store.clone())),
        store: store.clone(),
        sessions,
    };

    TestApp {
        router: app(state),
        gateway,
        store,
    }
}

fn test_app() -> TestApp {
    build(true, Arc::new(JwtSessionValidator::new(JWT_SECRET)))
}

fn session_token(user_id: &str, role: Option<&str>) -> String {
    let claims = Claims {
        sub: user_id.into(),
        role: role.map(Into::into),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET)).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn post_json(router: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_webhook(router: &Router, body: &str, signature: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/payment/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        request = request.header(SIGNATURE_HEADER, signature);
    }
    let (status, bytes) = send(router, request.body(Body::from(body.to_string())).unwrap()).await;
    (status, String::from_utf8(bytes).unwrap())
}

async fn get(router: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let (status, bytes) = send(router, request.body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn captured_event(payment_id: &str, order_id: &str, amount_minor: i64) -> String {
    json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": {"payment": {"entity": {
            "id": payment_id,
            "order_id": order_id,
            "amount": amount_minor,
            "currency": "INR",
            "status": "captured",
            "notes": {"userId": "user_1"}
        }}}
    })
    .to_string()
}

#[tokio::test]
async fn checkout_verify_then_webhook_leaves_one_captured_record() {
    let app = test_app();

    // Checkout
    let (status, session) = post_json(
        &app.router,
        "/api/payment/checkout",
        &json!({
            "amount": 100,
            "userId": "user_1",
            "cartItems": [{"productId": "p1", "qty": 1}],
            "userShipping": {"address": "Test Address"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["success"], json!(true));
    assert_eq!(session["amount"].as_f64(), Some(100.0));
    assert_eq!(session["currency"], json!("INR"));
    assert_eq!(session["key"], json!("rzp_test_mock"));
    assert_eq!(app.gateway.orders().await[0].amount, 10_000);

    let order_id = session["orderId"].as_str().unwrap().to_string();
    assert!(app.store.is_empty().await);

    // Client confirmation
    let (status, verified) = post_json(
        &app.router,
        "/api/payment/verify-payment",
        &json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": "pay_test_1",
            "razorpay_signature": signature::payment_signature(KEY_SECRET, &order_id, "pay_test_1"),
            "amount": 100,
            "orderItems": [{"productId": "p1", "qty": 1}],
            "userId": "user_1",
            "userShipping": {"address": "Test Address"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["success"], json!(true));
    assert_eq!(verified["record"]["amount"].as_f64(), Some(100.0));
    assert_eq!(verified["record"]["payStatus"], json!("paid"));
    assert_eq!(verified["paymentDetails"], Value::Null);

    // Gateway push for the same payment
    let body = captured_event("pay_test_1", &order_id, 10_000);
    let digest = signature::webhook_signature(HOOK_SECRET, body.as_bytes());
    let (status, text) = post_webhook(&app.router, &body, Some(&digest)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"status": "ok"}));

    assert_eq!(app.store.len().await, 1);
    let record = app.store.find_by_payment_id("pay_test_1").await.unwrap().unwrap();
    assert_eq!(record.pay_status, PayStatus::Captured);
    assert_eq!(record.order_items.len(), 1);
    assert_eq!(record.user_shipping, json!({"address": "Test Address"}));
}

#[tokio::test]
async fn webhook_before_verify_still_leaves_one_record() {
    let app = test_app();

    let body = captured_event("pay_early", "order_early", 25_050);
    let digest = signature::webhook_signature(HOOK_SECRET, body.as_bytes());
    let (status, _) = post_webhook(&app.router, &body, Some(&digest)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, verified) = post_json(
        &app.router,
        "/api/payment/verify-payment",
        &json!({
            "orderId": "order_early",
            "paymentId": "pay_early",
            "signature": signature::payment_signature(KEY_SECRET, "order_early", "pay_early"),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["record"]["amount"].as_f64(), Some(250.5));
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn webhook_before_verify_keeps_cart_items_from_order_notes() {
    let app = test_app();

    let (status, session) = post_json(
        &app.router,
        "/api/payment/checkout",
        &json!({
            "amount": 100,
            "userId": "user_1",
            "cartItems": [{"productId": "p1", "qty": 1}],
            "userShipping": {"address": "Test Address"}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = session["orderId"].as_str().unwrap().to_string();

    // The provider copies the order notes onto the payment entity
    let notes = serde_json::to_value(&app.gateway.orders().await[0].notes).unwrap();
    let body = json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": {"payment": {"entity": {
            "id": "pay_x",
            "order_id": order_id,
            "amount": 10_000,
            "currency": "INR",
            "status": "captured",
            "notes": notes
        }}}
    })
    .to_string();
    let digest = signature::webhook_signature(HOOK_SECRET, body.as_bytes());
    let (status, _) = post_webhook(&app.router, &body, Some(&digest)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, verified) = post_json(
        &app.router,
        "/api/payment/verify-payment",
        &json!({
            "orderId": order_id,
            "paymentId": "pay_x",
            "signature": signature::payment_signature(KEY_SECRET, &order_id, "pay_x"),
            "orderItems": [{"productId": "p1", "qty": 1}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["record"]["orderItems"], json!([{"productId": "p1", "qty": 1}]));

    assert_eq!(app.store.len().await, 1);
    let record = app.store.find_by_payment_id("pay_x").await.unwrap().unwrap();
    assert_eq!(record.order_items.len(), 1);
    assert_eq!(record.user_id.as_deref(), Some("user_1"));
    assert_eq!(record.user_shipping, json!({"address": "Test Address"}));
}

#[tokio::test]
async fn checkout_ignores_non_string_user_id() {
    let app = test_app();

    let (status, session) =
        post_json(&app.router, "/api/payment/checkout", &json!({"amount": 100, "userId": 42})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["success"], json!(true));
    assert!(app.gateway.orders().await[0].notes.user_id.is_none());
}

#[tokio::test]
async fn unknown_webhook_event_is_acknowledged_without_write() {
    let app = test_app();
    let body = json!({"event": "refund.created", "payload": {"refund": {"entity": {"id": "rfnd_1"}}}}).to_string();
    let digest = signature::webhook_signature(HOOK_SECRET, body.as_bytes());

    let (status, _) = post_webhook(&app.router, &body, Some(&digest)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn webhook_rejections_are_plain_text() {
    let app = test_app();
    let body = captured_event("pay_1", "order_1", 100);

    let (status, text) = post_webhook(&app.router, &body, Some("deadbeef")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "invalid signature");

    let (status, text) = post_webhook(&app.router, &body, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "invalid signature");

    let (status, text) = post_webhook(&app.router, "", Some("deadbeef")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "missing body");

    assert!(app.store.is_empty().await);

    let unconfigured = build(false, Arc::new(RejectAllValidator));
    let (status, text) = post_webhook(&unconfigured.router, &body, Some("deadbeef")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "webhook secret not configured");
}

#[tokio::test]
async fn checkout_and_verify_errors() {
    let app = test_app();

    let (status, error) = post_json(&app.router, "/api/payment/checkout", &json!({"amount": -5})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["success"], json!(false));
    assert_eq!(error["code"], json!("INVALID_AMOUNT"));
    assert!(app.gateway.orders().await.is_empty());

    let (status, error) = post_json(
        &app.router,
        "/api/payment/verify-payment",
        &json!({"orderId": "order_1", "paymentId": "pay_1", "signature": "0".repeat(64)}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], json!("SIGNATURE_MISMATCH"));

    let (status, error) = post_json(&app.router, "/api/payment/verify-payment", &json!({"orderId": "order_1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], json!("MISSING_FIELDS"));
    assert!(error["message"].as_str().unwrap().contains("paymentId"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/payment/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, bytes) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["code"], json!("INVALID_JSON"));

    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn unconfigured_payments_answer_server_errors() {
    let app = build(false, Arc::new(RejectAllValidator));

    let (status, error) = post_json(&app.router, "/api/payment/checkout", &json!({"amount": 100})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["code"], json!("PROVIDER_NOT_CONFIGURED"));

    let (status, error) = post_json(
        &app.router,
        "/api/payment/verify-payment",
        &json!({"orderId": "order_1", "paymentId": "pay_1", "signature": "abc"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["code"], json!("SERVER_MISCONFIGURED"));

    let (status, health) = get(&app.router, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["paymentsConfigured"], json!(false));
    assert_eq!(health["store"], json!("memory"));
}

#[tokio::test]
async fn order_listings_require_sessions() {
    let app = test_app();

    let now = chrono::Utc::now();
    for (minutes_ago, payment_id, order_id, user) in
        [(10, "pay_a", "order_a", "user_1"), (5, "pay_b", "order_b", "user_2")]
    {
        let mut record = shop_core::PaymentRecord::new(order_id, rust_decimal::Decimal::ONE_HUNDRED);
        record.order_date = now - chrono::Duration::minutes(minutes_ago);
        record.payment_id = Some(payment_id.into());
        record.user_id = Some(user.into());
        app.store.upsert_by_payment_id(record, None).await.unwrap();
    }

    let (status, _) = get(&app.router, "/api/payment/userorder", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app.router, "/api/payment/userorder", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user_token = session_token("user_1", None);
    let (status, body) = get(&app.router, "/api/payment/userorder", Some(&user_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["paymentId"], json!("pay_a"));

    let (status, body) = get(&app.router, "/api/payment/orders", Some(&user_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("FORBIDDEN"));

    let admin_token = session_token("admin_1", Some("admin"));
    let (status, body) = get(&app.router, "/api/payment/orders", Some(&admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["paymentId"], json!("pay_b"));
}

#[tokio::test]
async fn listings_without_session_secret_are_unauthorized() {
    let app = build(true, Arc::new(RejectAllValidator));
    let token = session_token("user_1", None);
    let (status, body) = get(&app.router, "/api/payment/userorder", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
}
