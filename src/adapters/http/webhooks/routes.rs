//! Axum router configuration for the payment endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::handlers::{
    handle_razorpay_webhook, handle_stripe_webhook, health, verify_razorpay_payment,
    WebhookAppState,
};

/// Provider webhook routes, mounted at `/api/webhooks`.
///
/// No user authentication: each delivery is verified by signature.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new()
        .route("/stripe", post(handle_stripe_webhook))
        .route("/razorpay", post(handle_razorpay_webhook))
}

/// Payment routes, mounted at `/api/payments`.
pub fn payment_routes() -> Router<WebhookAppState> {
    Router::new().route("/razorpay/verify", post(verify_razorpay_payment))
}

/// Create the complete application router with its middleware stack.
///
/// # Routes
/// - `POST /api/webhooks/stripe`
/// - `POST /api/webhooks/razorpay`
/// - `POST /api/payments/razorpay/verify`
/// - `GET /health`
pub fn app_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/webhooks", webhook_routes())
        .nest("/api/payments", payment_routes())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
