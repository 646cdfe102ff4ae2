//! Stripe webhook signature verification
//!
//! The `Stripe-Signature` header carries `t=<unix>,v1=<hex>,...`; the
//! signed payload is `"{t}.{raw body}"` under HMAC-SHA256 with the endpoint
//! secret. Events older than the tolerance window are rejected to blunt
//! replay.

use chrono::Utc;
use council_application::ports::payment::PaymentError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_TOLERANCE_SECS: i64 = 300;

pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    #[cfg(test)]
    fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify the header against the raw body; returns the timestamp on
    /// success.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<i64, PaymentError> {
        let (timestamp, signatures) = parse_header(signature_header)?;

        let age = Utc::now().timestamp() - timestamp;
        if age.abs() > self.tolerance_secs {
            return Err(PaymentError::StaleTimestamp);
        }

        let expected = self.sign(timestamp, payload);
        if signatures.iter().any(|sig| constant_time_eq(sig, &expected)) {
            Ok(timestamp)
        } else {
            Err(PaymentError::InvalidSignature)
        }
    }

    fn sign(&self, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Parse `t=<unix>,v1=<hex>[,v1=<hex>...]`.
fn parse_header(header: &str) -> Result<(i64, Vec<String>), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::MalformedEvent("signature header has no timestamp".to_string())
    })?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature);
    }
    Ok((timestamp, signatures))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let verifier = WebhookVerifier::new(secret);
        format!("t={},v1={}", timestamp, verifier.sign(timestamp, payload))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let verifier = WebhookVerifier::new("whsec_test");
        let payload = br#"{"id":"evt_1"}"#;
        let now = Utc::now().timestamp();
        let header = signed_header("whsec_test", now, payload);
        assert_eq!(verifier.verify(payload, &header).unwrap(), now);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = WebhookVerifier::new("whsec_real");
        let payload = b"{}";
        let header = signed_header("whsec_other", Utc::now().timestamp(), payload);
        assert!(matches!(
            verifier.verify(payload, &header),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let verifier = WebhookVerifier::new("whsec_test");
        let header = signed_header("whsec_test", Utc::now().timestamp(), b"original");
        assert!(matches!(
            verifier.verify(b"tampered", &header),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let verifier = WebhookVerifier::new("whsec_test").with_tolerance(60);
        let payload = b"{}";
        let old = Utc::now().timestamp() - 3600;
        let header = signed_header("whsec_test", old, payload);
        assert!(matches!(
            verifier.verify(payload, &header),
            Err(PaymentError::StaleTimestamp)
        ));
    }

    #[test]
    fn test_header_without_timestamp_rejected() {
        let verifier = WebhookVerifier::new("whsec_test");
        assert!(matches!(
            verifier.verify(b"{}", "v1=deadbeef"),
            Err(PaymentError::MalformedEvent(_))
        ));
    }
}
