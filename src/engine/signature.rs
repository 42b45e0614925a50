//! Payment callback signature verification.
//!
//! The gateway signs `"{gateway_order_id}|{gateway_payment_id}"` with a
//! shared secret (HMAC-SHA256, hex-encoded). Verification recomputes the MAC
//! and compares in constant time. Pure: no order is created or mutated here.

use crate::domain::PaymentConfirmation;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Missing field, malformed hex, or MAC mismatch. Verification never
    /// partially succeeds, so there is exactly one failure shape.
    #[error("signature invalid")]
    Invalid,
}

/// A payment confirmation whose signature has been checked.
///
/// Only [`PaymentVerifier::verify`] constructs this, so downstream code can
/// require proof of verification in its signature instead of re-checking.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    confirmation: PaymentConfirmation,
}

impl VerifiedPayment {
    pub fn gateway_order_id(&self) -> &str {
        &self.confirmation.gateway_order_id
    }

    pub fn gateway_payment_id(&self) -> &str {
        &self.confirmation.gateway_payment_id
    }
}

/// Recomputes and checks gateway callback signatures.
#[derive(Debug, Clone)]
pub struct PaymentVerifier {
    secret: String,
}

impl PaymentVerifier {
    /// Create a verifier over the shared gateway secret.
    ///
    /// Configuration guarantees the secret is present and non-empty before
    /// this is constructed; a missing secret is a startup failure, not a
    /// verification result.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify a confirmation's signature.
    ///
    /// # Errors
    /// Returns `SignatureError::Invalid` on any missing field, malformed hex
    /// signature, or MAC mismatch.
    pub fn verify(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<VerifiedPayment, SignatureError> {
        if confirmation.gateway_order_id.is_empty()
            || confirmation.gateway_payment_id.is_empty()
            || confirmation.signature.is_empty()
        {
            return Err(SignatureError::Invalid);
        }

        let payload = format!(
            "{}|{}",
            confirmation.gateway_order_id, confirmation.gateway_payment_id
        );

        let signature_bytes =
            hex::decode(&confirmation.signature).map_err(|_| SignatureError::Invalid)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::Invalid)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature_bytes)
            .map_err(|_| SignatureError::Invalid)?;

        Ok(VerifiedPayment {
            confirmation: confirmation.clone(),
        })
    }
}

/// Sign the canonical payload the way the gateway does.
///
/// Exists for tests and local tooling; production signatures always come
/// from the gateway.
pub fn sign(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}|{}", gateway_order_id, gateway_payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
