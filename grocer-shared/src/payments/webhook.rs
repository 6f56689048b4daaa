/// Webhook signature verification and event parsing
///
/// Stripe signs each delivery with the endpoint's signing secret and sends
/// the result in the `Stripe-Signature` header:
///
/// ```text
/// Stripe-Signature: t=1700000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
/// ```
///
/// The signed payload is `"{t}.{raw_body}"` and the signature is the
/// hex-encoded HMAC-SHA256 under the secret. Several `v1` entries may be present
/// during secret rotation; any match is accepted. Deliveries whose timestamp
/// is more than [`DEFAULT_TOLERANCE_SECS`] away from now are rejected to limit
/// replay.
///
/// # Example
///
/// ```
/// use grocer_shared::payments::webhook::{sign_payload, verify_signature, DEFAULT_TOLERANCE_SECS};
///
/// let secret = "whsec_test";
/// let payload = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#;
/// let now = 1_700_000_000;
///
/// let header = format!("t={},v1={}", now, sign_payload(secret, now, payload));
/// assert!(verify_signature(payload, &header, secret, now, DEFAULT_TOLERANCE_SECS).is_ok());
/// ```

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::CheckoutSession;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum accepted clock difference between signing and receipt
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Event type emitted when a Checkout payment completes
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

type HmacSha256 = Hmac<Sha256>;

/// Error type for webhook verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    /// Signature header absent
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    /// Header could not be parsed
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// No `v1` signature matched
    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,

    /// Timestamp outside tolerance
    #[error("Timestamp outside the tolerance zone")]
    TimestampOutOfTolerance,

    /// Body is not a valid event
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Signing timestamp (Unix seconds)
    pub timestamp: i64,

    /// Hex-encoded `v1` signatures
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parses `t=...,v1=...[,v1=...]`; unknown schemes (e.g. `v0`) are ignored
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                return Err(WebhookError::MalformedHeader(format!("bad element '{}'", part)));
            };

            match key {
                "t" => {
                    let ts = value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedHeader("timestamp is not an integer".to_string()))?;
                    timestamp = Some(ts);
                }
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::MalformedHeader("missing timestamp".to_string()))?;

        if signatures.is_empty() {
            return Err(WebhookError::MalformedHeader("no v1 signature".to_string()));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Computes the hex `v1` signature for a payload
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hex::encode(mac_for(secret, timestamp, payload).finalize().into_bytes())
}

/// Verifies a delivery against the signing secret
///
/// `now` is the receipt time in Unix seconds. Comparison is constant-time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<SignatureHeader, WebhookError> {
    let parsed = SignatureHeader::parse(header)?;

    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac_for(secret, parsed.timestamp, payload).verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    if now.abs_diff(parsed.timestamp) > tolerance_secs.unsigned_abs() {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    Ok(parsed)
}

/// A webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event ID (`evt_...`)
    pub id: String,

    /// Event type (e.g. `checkout.session.completed`)
    #[serde(rename = "type")]
    pub event_type: String,

    /// Event payload
    pub data: EventData,
}

/// Payload of an event
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The object the event is about
    pub object: serde_json::Value,
}

/// Events the order flow reacts to
#[derive(Debug, Clone)]
pub enum OrderEvent {
    /// Checkout finished; orders should be materialized
    CheckoutCompleted(CheckoutSession),

    /// Anything else; acknowledged and logged
    Other(String),
}

impl WebhookEvent {
    /// Parses an event from the raw (already verified) body
    pub fn from_slice(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    /// Classifies the event for the order flow
    pub fn into_order_event(self) -> Result<OrderEvent, WebhookError> {
        if self.event_type == CHECKOUT_SESSION_COMPLETED {
            let session: CheckoutSession = serde_json::from_value(self.data.object)
                .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
            Ok(OrderEvent::CheckoutCompleted(session))
        } else {
            Ok(OrderEvent::Other(self.event_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","payment_status":"paid"}}}"#;
    const NOW: i64 = 1_700_000_000;

    fn header_for(ts: i64, payload: &[u8]) -> String {
        format!("t={},v1={}", ts, sign_payload(SECRET, ts, payload))
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign_payload(SECRET, NOW, b"{}");
        let b = sign_payload(SECRET, NOW, b"{}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_payload(SECRET, NOW + 1, b"{}"));
    }

    #[test]
    fn test_valid_signature() {
        let parsed = verify_signature(PAYLOAD, &header_for(NOW, PAYLOAD), SECRET, NOW + 10, DEFAULT_TOLERANCE_SECS)
            .expect("signature should verify");
        assert_eq!(parsed.timestamp, NOW);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = header_for(NOW, PAYLOAD);
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_2"}}}"#;

        assert_eq!(
            verify_signature(tampered, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = header_for(NOW, PAYLOAD);
        assert_eq!(
            verify_signature(PAYLOAD, &header, "whsec_other", NOW, DEFAULT_TOLERANCE_SECS),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = header_for(NOW, PAYLOAD);
        assert_eq!(
            verify_signature(PAYLOAD, &header, SECRET, NOW + 301, DEFAULT_TOLERANCE_SECS),
            Err(WebhookError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        for ts in [i64::MIN, i64::MAX] {
            assert_eq!(
                verify_signature(PAYLOAD, &header_for(ts, PAYLOAD), SECRET, NOW, DEFAULT_TOLERANCE_SECS),
                Err(WebhookError::TimestampOutOfTolerance)
            );
        }
    }

    #[test]
    fn test_rotated_secret_any_v1_matches() {
        let good = sign_payload(SECRET, NOW, PAYLOAD);
        let header = format!("t={},v1=deadbeef,v0=ignored,v1={}", NOW, good);
        assert!(verify_signature(PAYLOAD, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_malformed_headers() {
        assert!(matches!(SignatureHeader::parse("v1=abc"), Err(WebhookError::MalformedHeader(_))));
        assert!(matches!(SignatureHeader::parse("t=abc,v1=abc"), Err(WebhookError::MalformedHeader(_))));
        assert!(matches!(SignatureHeader::parse("t=1"), Err(WebhookError::MalformedHeader(_))));
        assert!(matches!(SignatureHeader::parse("garbage"), Err(WebhookError::MalformedHeader(_))));
    }

    #[test]
    fn test_event_classification() {
        let event = WebhookEvent::from_slice(PAYLOAD).unwrap();
        assert_eq!(event.id, "evt_1");

        match event.into_order_event().unwrap() {
            OrderEvent::CheckoutCompleted(session) => {
                assert_eq!(session.id, "cs_1");
                assert!(session.is_paid());
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let other = WebhookEvent::from_slice(br#"{"id":"evt_2","type":"payment_intent.created","data":{"object":{}}}"#)
            .unwrap()
            .into_order_event()
            .unwrap();
        assert!(matches!(other, OrderEvent::Other(t) if t == "payment_intent.created"));
    }
}
