//! Webhook signature verification (HMAC-SHA512, hex encoded).

use hmac::{Hmac, Mac};
use sha2::Sha512;

/// Header carrying the signature on webhook deliveries.
pub const SIGNATURE_HEADER: &str = "monnify-signature";

type HmacSha512 = Hmac<Sha512>;

/// Verify `signature` equals hex(HMAC-SHA512(secret, payload)).
///
/// The comparison is constant time via `Mac::verify_slice`.
pub fn verify_webhook_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature Monnify would send for `payload`.
pub fn sign_webhook_body(payload: &[u8], secret: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-monnify-secret";

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"eventType":"SUCCESSFUL_TRANSACTION"}"#;
        let signature = sign_webhook_body(body, SECRET);
        assert_eq!(signature.len(), 128);
        assert!(verify_webhook_signature(body, &signature, SECRET));
        assert!(verify_webhook_signature(body, &signature.to_uppercase(), SECRET));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign_webhook_body(b"original", SECRET);
        assert!(!verify_webhook_signature(b"tampered", &signature, SECRET));
    }

    #[test]
    fn test_wrong_secret_and_garbage_rejected() {
        let body = b"payload";
        let signature = sign_webhook_body(body, "other-secret");
        assert!(!verify_webhook_signature(body, &signature, SECRET));
        assert!(!verify_webhook_signature(body, "not-hex", SECRET));
        assert!(!verify_webhook_signature(body, "", SECRET));
        assert!(!verify_webhook_signature(body, &sign_webhook_body(body, ""), ""));
    }
}
