//! Stripe webhook signature verification.
//!
//! The signed payload is `"{t}.{raw body}"`, authenticated with HMAC-SHA256
//! under the endpoint secret. During secret rotation Stripe sends one `v1`
//! entry per active secret, so any matching entry is accepted.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::event::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed timestamp (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Tolerated clock skew for timestamps in the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<unix>,v1=<hex>[,v1=<hex>...]`. Other schemes are skipped.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    let t = value
                        .parse()
                        .map_err(|_| WebhookError::ParseError("invalid timestamp".to_string()))?;
                    timestamp = Some(t);
                }
                "v1" => {
                    let sig = hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?;
                    v1_signatures.push(sig);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifies Stripe webhook deliveries against the endpoint secret.
pub struct StripeWebhookVerifier {
    secret: SecretString,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the signature against the current clock and decodes the envelope.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Same as [`verify_and_parse`](Self::verify_and_parse) with an explicit clock.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<StripeEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        check_timestamp(header.timestamp, now)?;

        let expected = compute_signature(self.secret.expose_secret(), header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_eq(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }
}

fn check_timestamp(timestamp: i64, now: i64) -> Result<(), WebhookError> {
    let age = now - timestamp;
    if age > MAX_EVENT_AGE_SECS {
        return Err(WebhookError::TimestampOutOfRange);
    }
    if age < -MAX_CLOCK_SKEW_SECS {
        return Err(WebhookError::InvalidTimestamp);
    }
    Ok(())
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Builds a valid `Stripe-Signature` header for a payload.
///
/// Used by tests and local tooling that replay captured events.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
    let signature = compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_704_067_200;
    const PAYLOAD: &str = r#"{"id":"evt_1","type":"checkout.session.completed","created":1704067200,"data":{"object":{}},"livemode":false}"#;

    fn verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(SECRET.to_string()))
    }

    // ══════════════════════════════════════════════════════════════
    // Header parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_collects_every_v1_entry() {
        let header = format!("t=12,v1={},v1={},v0={}", "a".repeat(64), "b".repeat(64), "c".repeat(64));

        let parsed = SignatureHeader::parse(&header).unwrap();

        assert_eq!(parsed.timestamp, 12);
        assert_eq!(parsed.v1_signatures.len(), 2);
    }

    #[test]
    fn parse_header_requires_timestamp_and_signature() {
        assert!(matches!(
            SignatureHeader::parse(&format!("v1={}", "a".repeat(64))),
            Err(WebhookError::ParseError(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=12"),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_rejects_garbage() {
        assert!(SignatureHeader::parse("t12").is_err());
        assert!(SignatureHeader::parse("t=abc,v1=00").is_err());
        assert!(SignatureHeader::parse("t=12,v1=zz").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_parses_event() {
        let header = sign_payload(SECRET, NOW, PAYLOAD.as_bytes()).unwrap();

        let event = verifier().verify_at(PAYLOAD.as_bytes(), &header, NOW).unwrap();

        assert_eq!(event.id, "evt_1");
    }

    #[test]
    fn rotated_secret_still_verifies() {
        let good = sign_payload(SECRET, NOW, PAYLOAD.as_bytes()).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "a".repeat(64), good_sig);

        assert!(verifier().verify_at(PAYLOAD.as_bytes(), &header, NOW).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = sign_payload("whsec_other", NOW, PAYLOAD.as_bytes()).unwrap();

        let result = verifier().verify_at(PAYLOAD.as_bytes(), &header, NOW);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = sign_payload(SECRET, NOW, PAYLOAD.as_bytes()).unwrap();
        let tampered = PAYLOAD.replace("evt_1", "evt_2");

        let result = verifier().verify_at(tampered.as_bytes(), &header, NOW);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn signed_garbage_is_a_parse_error() {
        let header = sign_payload(SECRET, NOW, b"not json").unwrap();

        let result = verifier().verify_at(b"not json", &header, NOW);

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Replay window
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_window_boundaries() {
        assert!(check_timestamp(NOW - 300, NOW).is_ok());
        assert!(matches!(
            check_timestamp(NOW - 301, NOW),
            Err(WebhookError::TimestampOutOfRange)
        ));
        assert!(check_timestamp(NOW + 60, NOW).is_ok());
        assert!(matches!(
            check_timestamp(NOW + 61, NOW),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn stale_delivery_is_rejected_before_signature_check() {
        let header = sign_payload(SECRET, NOW - 600, PAYLOAD.as_bytes()).unwrap();

        let result = verifier().verify_at(PAYLOAD.as_bytes(), &header, NOW);

        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }
}
