//! Stripe webhook signature verification.
//!
//! Implements secure verification of Stripe webhook signatures using HMAC-SHA256.
//! Includes timestamp validation to prevent replay attacks.

use secrecy::{ExposeSecret, SecretString};

use super::authenticator::{DeliveryHeaders, WebhookAuthenticator};
use super::payment_event::WebhookEnvelope;
use super::signature::{constant_time_compare, hmac_sha256};
use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;
use crate::domain::billing::PaymentProvider;

/// Default maximum age for webhook events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signatures (HMAC-SHA256). Stripe sends several while a secret is
    /// being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
    /// Optional v0 legacy signature, never trusted.
    pub v0_signature: Option<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>][,v0=<legacy>]`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures: Vec<Vec<u8>> = Vec::new();
        let mut v0_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                "v0" => {
                    v0_signature = Some(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v0 signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
            v0_signature,
        })
    }
}

/// Verifier for Stripe webhook signatures.
pub struct StripeWebhookVerifier {
    /// The webhook signing secret from Stripe dashboard.
    secret: SecretString,
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Overrides how old a signed timestamp may be.
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Checks the signature as of `now` (Unix seconds).
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        if self.secret.expose_secret().is_empty() {
            return Err(WebhookError::NotConfigured("STRIPE_WEBHOOK_SECRET"));
        }

        let header = SignatureHeader::parse(signature_header)?;
        self.validate_timestamp(header.timestamp, now)?;

        let expected = self.compute_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now - timestamp;

        // Reject events that are too old
        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }

        // Reject events from the future (with clock skew tolerance)
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature over `"<timestamp>.<payload>"`.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let prefix = format!("{}.", timestamp);
        hmac_sha256(
            self.secret.expose_secret().as_bytes(),
            &[prefix.as_bytes(), payload],
        )
    }
}

impl WebhookAuthenticator for StripeWebhookVerifier {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    fn signature_header(&self) -> &'static str {
        "Stripe-Signature"
    }

    fn authenticate(
        &self,
        payload: &[u8],
        headers: DeliveryHeaders<'_>,
    ) -> Result<WebhookEnvelope, WebhookError> {
        let signature = headers
            .signature
            .ok_or(WebhookError::MissingSignature("Stripe-Signature"))?;
        self.verify_at(payload, signature, chrono::Utc::now().timestamp())?;

        let raw: serde_json::Value =
            serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let event: StripeEvent = serde_json::from_value(raw.clone())
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(WebhookEnvelope {
            provider: PaymentProvider::Stripe,
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            created_at: event.created_at(),
            event: event.to_payment_event()?,
            payload: raw,
        })
    }
}

/// Builds a `Stripe-Signature` header value for test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let prefix = format!("{}.", timestamp);
    let mac = hmac_sha256(secret.as_bytes(), &[prefix.as_bytes(), payload.as_bytes()]).unwrap();
    format!("t={},v1={}", timestamp, hex::encode(mac))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhooks::payment_event::PaymentEvent;
    use crate::domain::webhooks::stripe_event::StripeEventBuilder;
    use proptest::prelude::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_700_000_000;

    fn verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_v1_only() {
        let signature = "a".repeat(64);
        let header_str = format!("t=1234567890,v1={}", signature);

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signatures.len(), 1);
        assert_eq!(header.v1_signatures[0].len(), 32);
        assert!(header.v0_signature.is_none());
    }

    #[test]
    fn parse_header_collects_every_v1() {
        let header_str = format!("t=1,v1={},v1={},v0={}", "a".repeat(64), "b".repeat(64), "c".repeat(64));

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.v1_signatures.len(), 2);
        assert!(header.v0_signature.is_some());
    }

    #[test]
    fn parse_header_ignores_unknown_fields() {
        let header_str = format!("t=1234567890,v1={},v2=future,scheme=hmac", "a".repeat(64));

        let header = SignatureHeader::parse(&header_str).unwrap();

        assert_eq!(header.timestamp, 1234567890);
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let header_str = format!("v1={}", "a".repeat(64));
        assert!(matches!(
            SignatureHeader::parse(&header_str),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_missing_v1_fails() {
        assert!(matches!(
            SignatureHeader::parse("t=1234567890"),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        assert!(matches!(
            SignatureHeader::parse("t=1234567890,v1=not_valid_hex"),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_no_equals_fails() {
        assert!(matches!(
            SignatureHeader::parse("t1234567890"),
            Err(WebhookError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let payload = r#"{"id":"evt_test123"}"#;
        let header = compute_test_signature(TEST_SECRET, NOW, payload);

        assert!(verifier().verify_at(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn verify_accepts_any_matching_v1() {
        let payload = r#"{"id":"evt_roll"}"#;
        let good = compute_test_signature(TEST_SECRET, NOW, payload);
        let header = format!("t={},v1={},{}", NOW, "0".repeat(64), good.split_once(',').unwrap().1);

        assert!(verifier().verify_at(payload.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let payload = r#"{"id":"evt_test"}"#;
        let header = compute_test_signature("whsec_other", NOW, payload);

        let result = verifier().verify_at(payload.as_bytes(), &header, NOW);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_tampered_payload_fails() {
        let header = compute_test_signature(TEST_SECRET, NOW, r#"{"id":"evt_test"}"#);

        let result = verifier().verify_at(br#"{"id":"evt_hacked"}"#, &header, NOW);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_with_empty_secret_is_not_configured() {
        let verifier = StripeWebhookVerifier::new(SecretString::new(String::new()));
        let header = compute_test_signature("", NOW, "{}");

        let result = verifier.verify_at(b"{}", &header, NOW);

        assert!(matches!(result, Err(WebhookError::NotConfigured(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_at_boundary_succeeds() {
        assert!(verifier().validate_timestamp(NOW - 300, NOW).is_ok());
    }

    #[test]
    fn timestamp_just_past_boundary_fails() {
        assert!(matches!(
            verifier().validate_timestamp(NOW - 301, NOW),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn timestamp_honours_custom_tolerance() {
        let verifier = verifier().with_tolerance(30);
        assert!(matches!(
            verifier.validate_timestamp(NOW - 31, NOW),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn timestamp_from_future_with_skew_succeeds() {
        assert!(verifier().validate_timestamp(NOW + 30, NOW).is_ok());
    }

    #[test]
    fn timestamp_too_far_in_future_fails() {
        assert!(matches!(
            verifier().validate_timestamp(NOW + 61, NOW),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Authenticator Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn authenticate_without_signature_is_missing_signature() {
        let result = verifier().authenticate(b"{}", DeliveryHeaders::default());

        assert!(matches!(
            result,
            Err(WebhookError::MissingSignature("Stripe-Signature"))
        ));
    }

    #[test]
    fn authenticate_builds_envelope_from_event() {
        let payload = StripeEventBuilder::new()
            .id("evt_env")
            .event_type("product.created")
            .to_json();
        let header = compute_test_signature(TEST_SECRET, chrono::Utc::now().timestamp(), &payload);

        let envelope = verifier()
            .authenticate(
                payload.as_bytes(),
                DeliveryHeaders {
                    signature: Some(&header),
                    event_id: None,
                },
            )
            .unwrap();

        assert_eq!(envelope.provider, PaymentProvider::Stripe);
        assert_eq!(envelope.event_id, "evt_env");
        assert_eq!(envelope.event_type, "product.created");
        assert!(matches!(envelope.event, PaymentEvent::Unrecognized { .. }));
    }

    #[test]
    fn authenticate_rejects_recognized_event_it_cannot_decode() {
        let payload = StripeEventBuilder::new()
            .id("evt_refund_no_list")
            .event_type("charge.refunded")
            .object(serde_json::json!({"id": "ch_1", "payment_intent": "pi_1"}))
            .to_json();
        let header = compute_test_signature(TEST_SECRET, chrono::Utc::now().timestamp(), &payload);

        let result = verifier().authenticate(
            payload.as_bytes(),
            DeliveryHeaders {
                signature: Some(&header),
                event_id: None,
            },
        );

        assert!(matches!(result, Err(WebhookError::MissingField(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn signed_payload_always_verifies(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let prefix = format!("{}.", NOW);
            let mac = hmac_sha256(TEST_SECRET.as_bytes(), &[prefix.as_bytes(), payload.as_slice()]).unwrap();
            let header = format!("t={},v1={}", NOW, hex::encode(mac));

            prop_assert!(verifier().verify_at(&payload, &header, NOW).is_ok());
        }

        #[test]
        fn any_bit_flip_in_payload_fails(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let prefix = format!("{}.", NOW);
            let mac = hmac_sha256(TEST_SECRET.as_bytes(), &[prefix.as_bytes(), payload.as_slice()]).unwrap();
            let header = format!("t={},v1={}", NOW, hex::encode(mac));

            let mut tampered = payload.clone();
            tampered[index.index(payload.len())] ^= 1 << bit;

            prop_assert!(matches!(
                verifier().verify_at(&tampered, &header, NOW),
                Err(WebhookError::InvalidSignature)
            ));
        }

        #[test]
        fn any_bit_flip_in_signature_fails(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            index in 0usize..32,
            bit in 0u8..8,
        ) {
            let prefix = format!("{}.", NOW);
            let mut mac = hmac_sha256(TEST_SECRET.as_bytes(), &[prefix.as_bytes(), payload.as_slice()]).unwrap();
            mac[index] ^= 1 << bit;
            let header = format!("t={},v1={}", NOW, hex::encode(mac));

            prop_assert!(matches!(
                verifier().verify_at(&payload, &header, NOW),
                Err(WebhookError::InvalidSignature)
            ));
        }
    }
}
