//! Storefront payment server
//!
//! Checkout, payment verification and Razorpay webhooks over one record
//! store. Runs without gateway credentials or a database: checkout and
//! verification then answer with configuration errors, and records are kept
//! in memory.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shop_core::{MemoryPaymentStore, PaymentGateway, PaymentStore, PgPaymentStore};
use shop_payments::{
    CheckoutInitiator, MockGateway, PaymentConfig, PaymentVerifier, RazorpayGateway,
    WebhookReconciler,
};
use shop_server::{
    app,
    auth::{JwtSessionValidator, RejectAllValidator, SessionValidator},
    config::{GatewayKind, ServerConfig},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let server = ServerConfig::from_env();
    let payments = Arc::new(PaymentConfig::from_env());

    // Record store
    let store: Arc<dyn PaymentStore> = match &server.database_url {
        Some(url) => {
            let pg = PgPaymentStore::connect(url.expose_secret(), server.db_name.as_deref()).await?;
            tracing::info!("✓ Connected to Postgres");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("⚠ DATABASE_URL not set - payment records are kept in memory");
            Arc::new(MemoryPaymentStore::new())
        }
    };

    // Payment gateway
    let gateway: Option<Arc<dyn PaymentGateway>> = match server.gateway {
        GatewayKind::Mock => {
            tracing::warn!("⚠ Using the mock payment gateway");
            Some(Arc::new(MockGateway::new()))
        }
        GatewayKind::Razorpay => match RazorpayGateway::from_config(&payments) {
            Ok(gateway) => {
                tracing::info!("✓ Razorpay configured");
                Some(Arc::new(gateway))
            }
            Err(e) => {
                tracing::warn!("⚠ Razorpay not configured - payments disabled ({})", e);
                tracing::warn!("  Set RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET in .env");
                None
            }
        },
    };

    if payments.webhook_signing_secret().is_none() {
        tracing::warn!("⚠ No webhook secret - webhook deliveries will be rejected");
    }

    // Sessions
    let sessions: Arc<dyn SessionValidator> = match &server.jwt_secret {
        Some(secret) => Arc::new(JwtSessionValidator::new(secret.expose_secret().as_bytes())),
        None => {
            tracing::warn!("⚠ JWT_SECRET not set - order listings will answer 401");
            Arc::new(RejectAllValidator)
        }
    };

    // Build application state
    let state = AppState {
        checkout: Arc::new(CheckoutInitiator::new(gateway.clone(), payments.currency.clone())),
        verifier: Arc::new(PaymentVerifier::new(payments.clone(), gateway, store.clone())),
        webhooks: Arc::new(WebhookReconciler::new(payments.clone(), store.clone())),
        store,
        sessions,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = app(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&server.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 shop-server running on http://{}", server.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                     - Health check");
    tracing::info!("  POST /api/payment/checkout       - Create gateway order");
    tracing::info!("  POST /api/payment/verify-payment - Verify and record payment");
    tracing::info!("  POST /api/payment/webhook        - Razorpay webhook");
    tracing::info!("  GET  /api/payment/userorder      - Caller's orders");
    tracing::info!("  GET  /api/payment/orders         - All orders (admin)");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
