//! Webhook authenticity verification.
//!
//! The booking platform signs every webhook body with HMAC-SHA256 over the
//! exact raw bytes and sends the hex digest in a header. Verification must
//! run over those same raw bytes — never a re-serialized form — and compare
//! in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signature verification failures. Always rejected before any other
/// processing of the webhook.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Verify a webhook body against its signature header.
///
/// Succeeds iff the header is the hex HMAC-SHA256 digest of `raw_body`
/// under `secret`. The comparison is constant-time (`Mac::verify_slice`).
pub fn verify(raw_body: &[u8], header: Option<&str>, secret: &[u8]) -> Result<(), AuthError> {
    let header = header.ok_or(AuthError::MissingSignature)?;
    let claimed = hex::decode(header.trim()).map_err(|_| AuthError::InvalidSignature)?;

    // HMAC keys of any length are accepted; new_from_slice only fails for
    // variable-output MACs, so this cannot error for HMAC-SHA256.
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| AuthError::InvalidSignature)?;
    mac.update(raw_body);
    mac.verify_slice(&claimed)
        .map_err(|_| AuthError::InvalidSignature)
}

/// Produce the hex signature for a body. Counterpart of [`verify`], used by
/// the test harness to build authentic requests.
pub fn sign(raw_body: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"shared-webhook-secret";

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"triggerEvent":"BOOKING_CREATED"}"#;
        let header = sign(body, SECRET);
        assert_eq!(verify(body, Some(&header), SECRET), Ok(()));
    }

    #[test]
    fn test_missing_header_rejected() {
        let body = b"anything";
        assert_eq!(verify(body, None, SECRET), Err(AuthError::MissingSignature));
    }

    #[test]
    fn test_single_byte_mutation_invalidates() {
        let body = b"{\"startTime\":\"2024-03-10T18:00:00Z\"}".to_vec();
        let header = sign(&body, SECRET);

        let mut mutated = body.clone();
        mutated[10] ^= 0x01;
        assert_eq!(
            verify(&mutated, Some(&header), SECRET),
            Err(AuthError::InvalidSignature)
        );
        // The untouched body still verifies.
        assert_eq!(verify(&body, Some(&header), SECRET), Ok(()));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = b"payload";
        let header = sign(body, SECRET);
        assert_eq!(
            verify(body, Some(&header), b"another-secret"),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_non_hex_header_rejected() {
        assert_eq!(
            verify(b"payload", Some("not-hex-at-all"), SECRET),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_reserialized_body_differs() {
        // Same JSON value, different byte layout — the digest must differ.
        let compact = br#"{"a":1,"b":2}"#;
        let spaced = br#"{ "a": 1, "b": 2 }"#;
        let header = sign(compact, SECRET);
        assert_eq!(
            verify(spaced, Some(&header), SECRET),
            Err(AuthError::InvalidSignature)
        );
    }
}
