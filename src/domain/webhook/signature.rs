//! HMAC-SHA256 verification of webhook bodies.
//!
//! The signature covers the exact bytes received. Callers must pass the raw
//! body, never a re-serialized parse of it.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

type HmacSha256 = Hmac<Sha256>;

/// How a request passed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Signature matched the configured secret.
    Verified,
    /// No secret configured; the request is accepted unchecked.
    Skipped,
}

/// Verifier for webhook signatures.
pub struct SignatureVerifier {
    secret: Option<SecretString>,
}

impl SignatureVerifier {
    /// Blank secrets count as unset.
    pub fn new(secret: Option<&str>) -> Self {
        let secret = secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.to_string()));
        Self { secret }
    }

    pub fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks `signature` against the HMAC of `raw_body`.
    ///
    /// With no secret configured every request passes as
    /// [`SignatureCheck::Skipped`]. With a secret, a missing header, a
    /// missing body, undecodable hex or a mismatch all fail closed.
    pub fn verify(
        &self,
        raw_body: Option<&[u8]>,
        signature: Option<&str>,
    ) -> Result<SignatureCheck, WebhookError> {
        let Some(secret) = &self.secret else {
            return Ok(SignatureCheck::Skipped);
        };
        let (Some(body), Some(signature)) = (raw_body, signature) else {
            return Err(WebhookError::InvalidSignature);
        };

        let received = hex::decode(signature.trim()).map_err(|_| WebhookError::InvalidSignature)?;
        let expected = hmac_bytes(secret.expose_secret().as_bytes(), body)?;

        if constant_time_compare(&expected, &received) {
            Ok(SignatureCheck::Verified)
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Signs a body with the configured secret, for self-probes.
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let secret = self.secret.as_ref()?;
        hmac_bytes(secret.expose_secret().as_bytes(), body)
            .ok()
            .map(hex::encode)
    }
}

/// Lowercase hex HMAC-SHA256 of `body` under `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    hmac_bytes(secret.as_bytes(), body)
        .map(hex::encode)
        .unwrap_or_default()
}

fn hmac_bytes(secret: &[u8], body: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time comparison; differing lengths fail without comparing bytes.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
