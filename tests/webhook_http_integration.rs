//! Integration tests for the webhook HTTP surface.
//!
//! Requests go through the full axum router (layers included) with every
//! port backed by a single `InMemoryBillingStore`, so each test can assert
//! both the HTTP response and the rows left behind.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use sound_lab_payments::adapters::http::{app_router, WebhookAppState};
use sound_lab_payments::adapters::InMemoryBillingStore;
use sound_lab_payments::application::{
    EventProjector, FulfillmentHandler, FulfillmentSettings, ProcessWebhookHandler,
};
use sound_lab_payments::domain::foundation::Timestamp;
use sound_lab_payments::domain::webhooks::{
    RazorpayWebhookVerifier, StripeWebhookVerifier, WebhookAuthenticator,
};

const RAZORPAY_WEBHOOK_SECRET: &str = "rzp_webhook_secret";
const RAZORPAY_KEY_SECRET: &str = "rzp_key_secret";
const STRIPE_WEBHOOK_SECRET: &str = "whsec_integration";

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app(store: &InMemoryBillingStore) -> Router {
    let fulfillment = Arc::new(FulfillmentHandler::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        FulfillmentSettings::default(),
    ));
    let projector = EventProjector::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        fulfillment,
    );
    let razorpay = Arc::new(RazorpayWebhookVerifier::new(
        SecretString::new(RAZORPAY_WEBHOOK_SECRET.to_string()),
        SecretString::new(RAZORPAY_KEY_SECRET.to_string()),
    ));
    let stripe: Arc<dyn WebhookAuthenticator> = Arc::new(StripeWebhookVerifier::new(
        SecretString::new(STRIPE_WEBHOOK_SECRET.to_string()),
    ));
    let authenticators = vec![stripe, razorpay.clone() as Arc<dyn WebhookAuthenticator>];

    let state = WebhookAppState {
        webhook_handler: Arc::new(ProcessWebhookHandler::new(
            authenticators,
            Arc::new(store.clone()),
            Arc::new(projector),
        )),
        razorpay_verifier: razorpay,
    };
    app_router(state, Duration::from_secs(5))
}

fn hmac_hex(secret: &str, parts: &[&[u8]]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    for part in parts {
        mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes())
}

fn razorpay_signature(body: &[u8]) -> String {
    hmac_hex(RAZORPAY_WEBHOOK_SECRET, &[body])
}

fn stripe_signature(body: &[u8]) -> String {
    let timestamp = Timestamp::now().as_unix_secs();
    let prefix = format!("{}.", timestamp);
    let v1 = hmac_hex(STRIPE_WEBHOOK_SECRET, &[prefix.as_bytes(), body]);
    format!("t={},v1={}", timestamp, v1)
}

fn razorpay_request(body: &[u8], signature: Option<&str>, event_id: &str) -> Request<Body> {
    let mut builder = Request::post("/api/webhooks/razorpay")
        .header("content-type", "application/json")
        .header("X-Razorpay-Event-Id", event_id);
    if let Some(signature) = signature {
        builder = builder.header("X-Razorpay-Signature", signature);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

fn stripe_request(body: &[u8], signature: &str) -> Request<Body> {
    Request::post("/api/webhooks/stripe")
        .header("content-type", "application/json")
        .header("Stripe-Signature", signature)
        .body(Body::from(body.to_vec()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn razorpay_payment_event(event: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "entity": "event",
        "account_id": "acc_soundlab",
        "event": event,
        "contains": ["payment"],
        "created_at": 1_700_000_000,
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_29QQoUBi66xm2f",
                    "entity": "payment",
                    "amount": 49900,
                    "currency": "INR",
                    "status": status,
                    "order_id": "order_9A33XWu170gUtm",
                    "method": "card",
                    "fee": 998,
                    "tax": 152,
                    "error_code": if status == "failed" { json!("BAD_REQUEST_ERROR") } else { Value::Null },
                    "error_description": if status == "failed" { json!("Payment declined") } else { Value::Null },
                    "notes": {
                        "type": "license",
                        "licenseId": "lic_commercial_01",
                        "userId": "user_42"
                    },
                    "created_at": 1_700_000_000
                }
            }
        }
    }))
    .unwrap()
}

fn stripe_succeeded_event() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_1NG8Du2eZvKYlo2CUI79vXWy",
        "object": "event",
        "type": "payment_intent.succeeded",
        "created": 1_700_000_000,
        "livemode": false,
        "data": {
            "object": {
                "id": "pi_3NG8Du2eZvKYlo2C0tAp2cFo",
                "object": "payment_intent",
                "amount": 2900,
                "amount_received": 2900,
                "currency": "usd",
                "status": "succeeded",
                "payment_method_types": ["card"],
                "metadata": {
                    "type": "generation",
                    "generationId": "gen_7f3a",
                    "userId": "user_42"
                },
                "created": 1_700_000_000
            }
        }
    }))
    .unwrap()
}

// =============================================================================
// Razorpay
// =============================================================================

#[tokio::test]
async fn captured_license_payment_grants_exactly_one_license() {
    let store = InMemoryBillingStore::new();
    let body = razorpay_payment_event("payment.captured", "captured");
    let signature = razorpay_signature(&body);

    let (status, response) = send(
        app(&store),
        razorpay_request(&body, Some(&signature), "evt_capture_1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"received": true}));

    let payment = store.payment("pay_29QQoUBi66xm2f").await.unwrap();
    assert_eq!(payment.status.as_str(), "captured");
    assert_eq!(payment.amount_minor, 49900);
    assert_eq!(payment.fee_minor, 998);

    let licenses = store.licenses().await;
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].license_id, "lic_commercial_01");
    assert_eq!(licenses[0].user_id, "user_42");
}

#[tokio::test]
async fn replayed_capture_leaves_rows_unchanged() {
    let store = InMemoryBillingStore::new();
    let app = app(&store);
    let body = razorpay_payment_event("payment.captured", "captured");
    let signature = razorpay_signature(&body);

    let (status, _) = send(
        app.clone(),
        razorpay_request(&body, Some(&signature), "evt_capture_1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payment_after_one = store.payment("pay_29QQoUBi66xm2f").await;
    let licenses_after_one = store.licenses().await;
    let writes_after_one = store.write_count();

    let (status, response) = send(
        app,
        razorpay_request(&body, Some(&signature), "evt_capture_1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"received": true}));
    assert_eq!(store.payment("pay_29QQoUBi66xm2f").await, payment_after_one);
    assert_eq!(store.licenses().await, licenses_after_one);
    assert_eq!(store.write_count(), writes_after_one);
    assert_eq!(store.webhook_event_count().await, 1);
}

#[tokio::test]
async fn redelivery_under_new_event_id_is_still_idempotent() {
    let store = InMemoryBillingStore::new();
    let app = app(&store);
    let body = razorpay_payment_event("payment.captured", "captured");
    let signature = razorpay_signature(&body);

    send(
        app.clone(),
        razorpay_request(&body, Some(&signature), "evt_capture_1"),
    )
    .await;
    let payment_after_one = store.payment("pay_29QQoUBi66xm2f").await;

    let (status, _) = send(
        app,
        razorpay_request(&body, Some(&signature), "evt_capture_2"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.payment("pay_29QQoUBi66xm2f").await, payment_after_one);
    assert_eq!(store.licenses().await.len(), 1);
}

#[tokio::test]
async fn failed_payment_is_recorded_without_fulfillment() {
    let store = InMemoryBillingStore::new();
    let body = razorpay_payment_event("payment.failed", "failed");
    let signature = razorpay_signature(&body);

    let (status, _) = send(
        app(&store),
        razorpay_request(&body, Some(&signature), "evt_failed_1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let payment = store.payment("pay_29QQoUBi66xm2f").await.unwrap();
    assert_eq!(payment.status.as_str(), "failed");
    assert_eq!(payment.error_code.as_deref(), Some("BAD_REQUEST_ERROR"));
    assert!(store.licenses().await.is_empty());
    assert!(store.tasks().await.is_empty());
}

#[tokio::test]
async fn missing_razorpay_signature_is_rejected_without_writes() {
    let store = InMemoryBillingStore::new();
    let body = razorpay_payment_event("payment.captured", "captured");

    let (status, response) =
        send(app(&store), razorpay_request(&body, None, "evt_capture_1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.get("error").is_some());
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.webhook_event_count().await, 0);
}

#[tokio::test]
async fn unrecognized_event_type_is_acknowledged_without_writes() {
    let store = InMemoryBillingStore::new();
    let body = serde_json::to_vec(&json!({
        "entity": "event",
        "event": "virtual_account.credited",
        "payload": {"virtual_account": {"entity": {"id": "va_1"}}},
        "created_at": 1_700_000_000
    }))
    .unwrap();
    let signature = razorpay_signature(&body);

    let (status, response) = send(
        app(&store),
        razorpay_request(&body, Some(&signature), "evt_va_1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"received": true}));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn storage_outage_returns_500_for_provider_retry() {
    let store = InMemoryBillingStore::new();
    store.fail_writes(true);
    let body = razorpay_payment_event("payment.captured", "captured");
    let signature = razorpay_signature(&body);

    let (status, response) = send(
        app(&store),
        razorpay_request(&body, Some(&signature), "evt_capture_1"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["error"], "Webhook processing failed");
    assert!(response.get("details").is_some());
    assert_eq!(store.webhook_event_count().await, 0);
}

// =============================================================================
// Stripe
// =============================================================================

#[tokio::test]
async fn tampered_stripe_signature_is_rejected_then_valid_one_accepted() {
    let store = InMemoryBillingStore::new();
    store.seed_generation("gen_7f3a").await;
    let app = app(&store);
    let body = stripe_succeeded_event();
    let signature = stripe_signature(&body);

    // Flip the last hex digit of v1
    let mut tampered = signature.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == '0' { '1' } else { '0' });

    let (status, response) = send(app.clone(), stripe_request(&body, &tampered)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.get("error").is_some());
    assert_eq!(store.write_count(), 0);

    let (status, _) = send(app, stripe_request(&body, &signature)).await;
    assert_eq!(status, StatusCode::OK);

    let payment = store.payment("pi_3NG8Du2eZvKYlo2C0tAp2cFo").await.unwrap();
    assert_eq!(payment.id, "pi_3NG8Du2eZvKYlo2C0tAp2cFo");
    assert_eq!(payment.status.as_str(), "captured");
    assert_eq!(
        store.generation("gen_7f3a").await.unwrap().payment_status,
        "paid"
    );
}

#[tokio::test]
async fn stale_stripe_signature_timestamp_is_rejected() {
    let store = InMemoryBillingStore::new();
    let body = stripe_succeeded_event();
    let timestamp = Timestamp::now().as_unix_secs() - 3_600;
    let prefix = format!("{}.", timestamp);
    let signature = format!(
        "t={},v1={}",
        timestamp,
        hmac_hex(STRIPE_WEBHOOK_SECRET, &[prefix.as_bytes(), &body])
    );

    let (status, _) = send(app(&store), stripe_request(&body, &signature)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.write_count(), 0);
}

fn stripe_event(id: &str, event_type: &str, object: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": id,
        "object": "event",
        "type": event_type,
        "created": 1_700_000_000,
        "livemode": false,
        "data": {"object": object}
    }))
    .unwrap()
}

fn license_intent(status: &str) -> Value {
    let mut intent = json!({
        "id": "pi_retry_1",
        "object": "payment_intent",
        "amount": 4900,
        "amount_received": if status == "succeeded" { 4900 } else { 0 },
        "currency": "usd",
        "status": status,
        "payment_method_types": ["card"],
        "metadata": {
            "type": "license",
            "licenseId": "lic_sync_03",
            "userId": "user_42"
        },
        "created": 1_700_000_000
    });
    if status == "requires_payment_method" {
        intent["last_payment_error"] = json!({
            "code": "card_declined",
            "message": "Your card was declined."
        });
    }
    intent
}

#[tokio::test]
async fn stripe_decline_then_success_on_same_intent_grants_license() {
    let store = InMemoryBillingStore::new();
    let app = app(&store);

    let declined = stripe_event(
        "evt_decline_1",
        "payment_intent.payment_failed",
        license_intent("requires_payment_method"),
    );
    let (status, _) = send(app.clone(), stripe_request(&declined, &stripe_signature(&declined))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.payment("pi_retry_1").await.unwrap().status.as_str(), "failed");
    assert!(store.licenses().await.is_empty());

    let succeeded = stripe_event(
        "evt_success_1",
        "payment_intent.succeeded",
        license_intent("succeeded"),
    );
    let (status, _) = send(app, stripe_request(&succeeded, &stripe_signature(&succeeded))).await;

    assert_eq!(status, StatusCode::OK);
    let payment = store.payment("pi_retry_1").await.unwrap();
    assert_eq!(payment.status.as_str(), "captured");
    assert!(payment.error_code.is_none());
    let licenses = store.licenses().await;
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].license_id, "lic_sync_03");
    assert_eq!(licenses[0].payment_id, "pi_retry_1");
}

#[tokio::test]
async fn charge_refunded_without_refund_list_is_not_recorded() {
    let store = InMemoryBillingStore::new();
    let body = stripe_event(
        "evt_charge_refunded_1",
        "charge.refunded",
        json!({"id": "ch_1", "object": "charge", "payment_intent": "pi_1", "amount_refunded": 4999}),
    );

    let (status, response) = send(app(&store), stripe_request(&body, &stripe_signature(&body))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.get("error").is_some());
    assert_eq!(store.webhook_event_count().await, 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn stripe_refund_object_events_store_the_refund() {
    let store = InMemoryBillingStore::new();
    let app = app(&store);
    let refund = |status: &str| {
        json!({
            "id": "re_1",
            "object": "refund",
            "amount": 4999,
            "currency": "usd",
            "status": status,
            "payment_intent": "pi_1",
            "charge": "ch_1",
            "created": 1_700_000_100
        })
    };

    let created = stripe_event("evt_refund_created_1", "refund.created", refund("pending"));
    let (status, _) = send(app.clone(), stripe_request(&created, &stripe_signature(&created))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.refund("re_1").await.unwrap().status.as_str(), "created");

    let updated = stripe_event("evt_refund_updated_1", "refund.updated", refund("succeeded"));
    let (status, _) = send(app, stripe_request(&updated, &stripe_signature(&updated))).await;

    assert_eq!(status, StatusCode::OK);
    let stored = store.refund("re_1").await.unwrap();
    assert_eq!(stored.status.as_str(), "processed");
    assert_eq!(stored.payment_id, "pi_1");
    assert_eq!(stored.amount_minor, 4999);
    assert_eq!(store.webhook_event_count().await, 2);
}

#[tokio::test]
async fn stripe_invoice_events_drive_subscription_and_renewal_payment() {
    let store = InMemoryBillingStore::new();
    let app = app(&store);
    let invoice = json!({
        "id": "in_1",
        "object": "invoice",
        "subscription": "sub_pro_1",
        "payment_intent": "pi_renewal_1",
        "amount_paid": 1500,
        "currency": "usd",
        "subscription_details": {"metadata": {"userId": "user_42"}},
        "lines": {"data": [{
            "price": {"id": "price_pro"},
            "period": {"start": 1_700_000_000, "end": 1_702_592_000}
        }]},
        "created": 1_700_000_000
    });

    let paid = stripe_event("evt_invoice_paid_1", "invoice.payment_succeeded", invoice.clone());
    let (status, _) = send(app.clone(), stripe_request(&paid, &stripe_signature(&paid))).await;
    assert_eq!(status, StatusCode::OK);

    let subscription = store.subscription("sub_pro_1").await.unwrap();
    assert_eq!(subscription.status.as_str(), "active");
    assert_eq!(subscription.user_id.as_deref(), Some("user_42"));
    let payment = store.payment("pi_renewal_1").await.unwrap();
    assert_eq!(payment.status.as_str(), "captured");
    assert_eq!(payment.amount_minor, 1500);
    assert_eq!(payment.subscription_id.as_deref(), Some("sub_pro_1"));

    let failed = stripe_event("evt_invoice_failed_1", "invoice.payment_failed", invoice);
    let (status, _) = send(app, stripe_request(&failed, &stripe_signature(&failed))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        store.subscription("sub_pro_1").await.unwrap().status.as_str(),
        "past_due"
    );
}

// =============================================================================
// Checkout verification and health
// =============================================================================

#[tokio::test]
async fn checkout_signature_verification() {
    let store = InMemoryBillingStore::new();
    let signature = hmac_hex(
        RAZORPAY_KEY_SECRET,
        &[b"order_9A33XWu170gUtm|pay_29QQoUBi66xm2f"],
    );
    let request = |signature: &str| {
        Request::post("/api/payments/razorpay/verify")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "orderId": "order_9A33XWu170gUtm",
                    "paymentId": "pay_29QQoUBi66xm2f",
                    "signature": signature
                })
                .to_string(),
            ))
            .unwrap()
    };

    let (status, response) = send(app(&store), request(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["verified"], true);
    assert_eq!(response["orderId"], "order_9A33XWu170gUtm");

    let (status, _) = send(app(&store), request("deadbeef")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_verification_requires_all_fields() {
    let store = InMemoryBillingStore::new();
    let request = Request::post("/api/payments/razorpay/verify")
        .header("content-type", "application/json")
        .body(Body::from(json!({"orderId": "order_1"}).to_string()))
        .unwrap();

    let (status, response) = send(app(&store), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"],
        "Order ID, payment ID, and signature are required"
    );
}

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let store = InMemoryBillingStore::new();
    let response = app(&store)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
