//! Webhook authenticity check (HMAC-SHA256).
//!
//! GitHub signs each delivery with the shared secret and sends the result in
//! `X-Hub-Signature-256` as `sha256=<hex>`. The check runs on the raw body
//! before it is parsed. An empty secret disables the check, which is how the
//! monitor runs in local development.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The configured webhook secret.
#[derive(Clone, Default)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        WebhookSecret(secret.into())
    }

    /// Returns true if no secret is configured and checks are skipped.
    pub fn is_disabled(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks `signature_header` against `payload`.
    ///
    /// Always true when the secret is disabled.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> bool {
        self.is_disabled() || verify_signature(payload, signature_header, &self.0)
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_disabled() {
            f.write_str("WebhookSecret(disabled)")
        } else {
            f.write_str("WebhookSecret(***)")
        }
    }
}

/// Decodes `sha256=<hex>` into raw bytes. `None` on any malformed header.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    hex::decode(header.strip_prefix("sha256=")?).ok()
}

/// Computes the HMAC-SHA256 of `payload` under `secret`.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so construction cannot fail here.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats raw signature bytes as a header value.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies `signature_header` for `payload` in constant time.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected) = parse_signature_header(signature_header) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_header_variants() {
        assert_eq!(
            parse_signature_header("sha256=1234abcd"),
            Some(vec![0x12, 0x34, 0xab, 0xcd])
        );
        assert_eq!(parse_signature_header("1234abcd"), None);
        assert_eq!(parse_signature_header("sha1=1234abcd"), None);
        assert_eq!(parse_signature_header("sha256=xyz"), None);
        assert_eq!(parse_signature_header("sha256=abc"), None);
        assert_eq!(parse_signature_header(""), None);
    }

    #[test]
    fn known_vector() {
        // From GitHub's webhook validation documentation.
        let sig = compute_signature(b"Hello, World!", b"It's a Secret to Everybody");
        assert_eq!(
            format_signature_header(&sig),
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
    }

    #[test]
    fn verify_rejects_wrong_secret_and_tampering() {
        let header = format_signature_header(&compute_signature(b"body", b"right"));
        assert!(verify_signature(b"body", &header, b"right"));
        assert!(!verify_signature(b"body", &header, b"wrong"));
        assert!(!verify_signature(b"bodY", &header, b"right"));
        assert!(!verify_signature(b"body", "sha256=", b"right"));
    }

    #[test]
    fn disabled_secret_accepts_anything() {
        let secret = WebhookSecret::default();
        assert!(secret.is_disabled());
        assert!(secret.verify(b"anything", ""));
        assert!(secret.verify(b"anything", "garbage"));
    }

    #[test]
    fn configured_secret_checks() {
        let secret = WebhookSecret::new("s3cret");
        let header = format_signature_header(&compute_signature(b"{}", b"s3cret"));
        assert!(secret.verify(b"{}", &header));
        assert!(!secret.verify(b"{}", ""));
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", WebhookSecret::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }

    proptest! {
        #[test]
        fn computed_signature_always_verifies(
            payload in prop::collection::vec(any::<u8>(), 0..256),
            secret in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            let header = format_signature_header(&compute_signature(&payload, &secret));
            prop_assert!(verify_signature(&payload, &header, &secret));
        }

        #[test]
        fn parse_never_panics(header in ".*") {
            let _ = parse_signature_header(&header);
        }
    }
}
