//! Purchase webhook signature verification.
//!
//! Verifies HMAC-SHA256 signatures over the raw payload bytes using a shared
//! secret and a constant-time comparison. Verification must happen on the raw
//! bytes as received, never on a re-serialized form: re-serialization can
//! change the byte content and silently invalidate the check.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Verifier for purchase webhook signatures.
pub struct WebhookVerifier {
    /// Shared signing secret agreed with the payment provider.
    secret: Secret<String>,
}

impl WebhookVerifier {
    /// Creates a new verifier with the given signing secret.
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    /// Verifies a hex-encoded HMAC-SHA256 signature over the raw payload.
    ///
    /// # Errors
    ///
    /// - `MalformedSignature` - the declared signature is not valid hex
    /// - `InvalidSignature` - the signature does not match the payload
    pub fn verify(&self, payload: &[u8], declared_signature: &str) -> Result<(), WebhookError> {
        let declared = hex::decode(declared_signature.trim())
            .map_err(|_| WebhookError::MalformedSignature)?;

        let expected = self.compute_signature(payload);

        if !constant_time_compare(&expected, &declared) {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature of the payload bytes.
    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// Prevents timing attacks that could leak information about the expected
/// signature. The length check short-circuits, which is fine: signature
/// length is public.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
