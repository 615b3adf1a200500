//! HTTP handlers for provider webhooks and checkout verification.
//!
//! Webhook handlers take the body as raw `Bytes`: signatures cover the exact
//! bytes on the wire, so nothing may parse or re-serialize them first.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use super::dto::{
    ErrorResponse, HealthResponse, VerifyPaymentRequest, VerifyPaymentResponse, WebhookAck,
};
use crate::application::{ProcessWebhookCommand, ProcessWebhookHandler};
use crate::domain::billing::PaymentProvider;
use crate::domain::webhooks::{RazorpayWebhookVerifier, WebhookError, RAZORPAY_EVENT_ID_HEADER};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct WebhookAppState {
    pub webhook_handler: Arc<ProcessWebhookHandler>,
    /// Checks checkout signatures with the Razorpay key secret.
    pub razorpay_verifier: Arc<RazorpayWebhookVerifier>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Handle Stripe webhook events
pub async fn handle_stripe_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    process(&state, PaymentProvider::Stripe, "Stripe-Signature", None, &headers, body).await
}

/// POST /api/webhooks/razorpay - Handle Razorpay webhook events
pub async fn handle_razorpay_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    process(
        &state,
        PaymentProvider::Razorpay,
        "X-Razorpay-Signature",
        Some(RAZORPAY_EVENT_ID_HEADER),
        &headers,
        body,
    )
    .await
}

async fn process(
    state: &WebhookAppState,
    provider: PaymentProvider,
    signature_header: &str,
    event_id_header: Option<&str>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookApiError> {
    let cmd = ProcessWebhookCommand {
        provider,
        payload: body.to_vec(),
        signature: header(headers, signature_header),
        event_id: event_id_header.and_then(|name| header(headers, name)),
    };

    state.webhook_handler.handle(cmd).await?;

    Ok(Json(WebhookAck::received()))
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST /api/payments/razorpay/verify - Confirm a checkout signature
pub async fn verify_razorpay_payment(
    State(state): State<WebhookAppState>,
    body: Bytes,
) -> Result<Json<VerifyPaymentResponse>, WebhookApiError> {
    let request: VerifyPaymentRequest = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::ParseError(e.to_string()))?;

    let (Some(order_id), Some(payment_id), Some(signature)) =
        (request.order_id, request.payment_id, request.signature)
    else {
        return Err(WebhookApiError::BadRequest(
            "Order ID, payment ID, and signature are required",
        ));
    };

    state
        .razorpay_verifier
        .verify_payment_signature(&order_id, &payment_id, &signature)
        .map_err(|e| {
            tracing::warn!(%order_id, %payment_id, error = %e, "Checkout signature rejected");
            e
        })?;

    Ok(Json(VerifyPaymentResponse {
        verified: true,
        order_id,
        payment_id,
    }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub enum WebhookApiError {
    Webhook(WebhookError),
    BadRequest(&'static str),
}

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            WebhookApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
            WebhookApiError::Webhook(err) => {
                let status = err.status_code();
                let body = if err.is_retryable() {
                    ErrorResponse::with_details("Webhook processing failed", err.to_string())
                } else {
                    ErrorResponse::new(err.to_string())
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: WebhookApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn signature_error_is_400_without_details() {
        let (status, body) = body_json(WebhookError::InvalidSignature.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid signature");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn database_error_is_500_with_details() {
        let (status, body) =
            body_json(WebhookError::Database("connection refused".to_string()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Webhook processing failed");
        assert!(body["details"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
    }
}
