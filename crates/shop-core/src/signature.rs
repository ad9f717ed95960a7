//! HMAC-SHA256 Signatures
//!
//! Checkout confirmations are signed over `"{order_id}|{payment_id}"` with the
//! API key secret; webhook deliveries are signed over the raw request body
//! with the webhook secret. Both are lowercase hex digests.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message` keyed by `secret`.
pub fn sign_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Expected signature for a client-confirmed payment.
pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    let payload = format!("{order_id}|{payment_id}");
    sign_hex(secret.as_bytes(), payload.as_bytes())
}

/// Expected signature for a webhook delivery.
pub fn webhook_signature(secret: &str, raw_body: &[u8]) -> String {
    sign_hex(secret.as_bytes(), raw_body)
}

/// Constant-time comparison of an expected digest against a supplied one.
pub fn digests_match(expected: &str, supplied: &str) -> bool {
    let (a, b) = (expected.as_bytes(), supplied.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
