//! HMAC-SHA256 primitives shared by the provider verifiers.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::webhook_errors::WebhookError;

/// Computes `HMAC-SHA256(secret, parts[0] || parts[1] || ...)`.
pub(crate) fn hmac_sha256(secret: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|_| WebhookError::NotConfigured("webhook secret"))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Performs constant-time comparison of two byte slices.
///
/// Length is not secret; only the contents are compared in constant time.
pub(crate) fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hex SHA-256 digest, used to derive an event id from an unsigned body.
pub(crate) fn sha256_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
