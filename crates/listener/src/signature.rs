//! `X-Hub-Signature-256` verification.
//!
//! GitHub signs every delivery with HMAC-SHA256 over the raw request body,
//! keyed with the webhook secret, and sends the digest as
//! `sha256=<lowercase hex>`. Anything that is not exactly that shape fails
//! closed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of a SHA-256 signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Returns whether `header` is a valid signature of `body` under `secret`.
///
/// The digest comparison runs in constant time.
pub fn verify(body: &[u8], header: &str, secret: &[u8]) -> bool {
    let Some(hex_digest) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(provided) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    bool::from(expected.as_slice().ct_eq(provided.as_slice()))
}

/// Formats the header value GitHub would send for `body`.
#[cfg(test)]
pub(crate) fn sign(body: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Holds the configured webhook secret.
///
/// Without a secret nothing can be verified, so every delivery is rejected.
#[derive(Clone, Default)]
pub struct SignatureVerifier {
    secret: Option<Vec<u8>>,
}

impl SignatureVerifier {
    /// An empty secret counts as no secret.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn verify(&self, body: &[u8], header: &str) -> bool {
        match &self.secret {
            Some(secret) => verify(body, header, secret),
            None => false,
        }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}
