//! Provider webhook verification and parsing.
//!
//! Stripe signs every delivery with a `Stripe-Signature` header of the form
//! `t=<unix>,v1=<hex>[,v1=<hex>...]`. The signature is HMAC-SHA256 over
//! `"{t}.{raw body}"` keyed with the endpoint secret, so verification must
//! run on the exact bytes received, before any JSON parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::provider::{CheckoutSession, Settlement};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Signature verification
// ---------------------------------------------------------------------------

/// Reasons a webhook signature is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header has no timestamp")]
    MissingTimestamp,

    #[error("Signature header has no v1 signature")]
    MissingSignature,

    #[error("Signature timestamp is not a valid integer")]
    InvalidTimestamp,

    #[error("Signature timestamp is outside the tolerance window")]
    OutsideTolerance,

    #[error("No signature matches the payload")]
    Mismatch,
}

/// Compute the hex `v1` signature for `payload` signed at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hex::encode(signer(secret, timestamp, payload).finalize().into_bytes())
}

/// Build a complete signature header value, as the provider would send it.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!("t={timestamp},v1={}", compute_signature(secret, timestamp, payload))
}

fn signer(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Verify a webhook delivery.
///
/// Accepts when any `v1` entry matches (the provider sends several while a
/// secret is being rolled) and `t` is within `tolerance_secs` of `now`.
/// Comparison is constant-time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp: i64 = timestamp
        .ok_or(SignatureError::MissingTimestamp)?
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::OutsideTolerance);
    }

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| {
            signer(secret, timestamp, payload)
                .verify_slice(&bytes)
                .is_ok()
        })
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

// ---------------------------------------------------------------------------
// Event parsing
// ---------------------------------------------------------------------------

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";
pub const CHECKOUT_ASYNC_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const CHECKOUT_ASYNC_FAILED: &str = "checkout.session.async_payment_failed";

/// A webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Provider event ID (`evt_...`), unique per event across redeliveries.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// A checkout session event reduced to what it means for the booking.
#[derive(Debug, Clone)]
pub struct CheckoutUpdate {
    pub session: CheckoutSession,
    pub settlement: Settlement,
}

impl WebhookEvent {
    /// Parse a verified payload.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Interpret a checkout session event.
    ///
    /// Returns `Ok(None)` for event types we do not act on.
    pub fn checkout_update(&self) -> Result<Option<CheckoutUpdate>, serde_json::Error> {
        let settlement = match self.event_type.as_str() {
            CHECKOUT_COMPLETED => None,
            CHECKOUT_ASYNC_SUCCEEDED => Some(Settlement::Paid),
            CHECKOUT_EXPIRED | CHECKOUT_ASYNC_FAILED => Some(Settlement::Failed),
            _ => return Ok(None),
        };

        let session: CheckoutSession = serde_json::from_value(self.data.object.clone())?;
        // A completed session may still await a delayed payment method.
        let settlement = settlement.unwrap_or_else(|| session.settlement());
        Ok(Some(CheckoutUpdate {
            session,
            settlement,
        }))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn completed_payload() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_1",
                    "object": "checkout.session",
                    "status": "complete",
                    "payment_status": "paid",
                    "payment_intent": "pi_1",
                    "amount_total": 2500,
                    "currency": "eur",
                    "metadata": {"booking_id": "42"}
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = completed_payload();
        let header = signature_header(SECRET, NOW, &payload);
        assert!(verify_signature(&payload, &header, SECRET, 300, NOW + 10).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let payload = completed_payload();
        let header = signature_header(SECRET, NOW, &payload);
        let mut tampered = payload.clone();
        tampered.push(b' ');
        assert_eq!(
            verify_signature(&tampered, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = completed_payload();
        let header = signature_header("whsec_other", NOW, &payload);
        assert_eq!(
            verify_signature(&payload, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = completed_payload();
        let header = signature_header(SECRET, NOW, &payload);
        assert_eq!(
            verify_signature(&payload, &header, SECRET, 300, NOW + 301),
            Err(SignatureError::OutsideTolerance)
        );
    }

    #[test]
    fn any_matching_v1_is_enough() {
        let payload = completed_payload();
        let good = compute_signature(SECRET, NOW, &payload);
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good}");
        assert!(verify_signature(&payload, &header, SECRET, 300, NOW).is_ok());
    }

    #[test]
    fn malformed_headers() {
        let payload = completed_payload();
        assert_eq!(
            verify_signature(&payload, "v1=abc", SECRET, 300, NOW),
            Err(SignatureError::MissingTimestamp)
        );
        assert_eq!(
            verify_signature(&payload, "t=abc,v1=00", SECRET, 300, NOW),
            Err(SignatureError::InvalidTimestamp)
        );
        assert_eq!(
            verify_signature(&payload, &format!("t={NOW}"), SECRET, 300, NOW),
            Err(SignatureError::MissingSignature)
        );
        assert_eq!(
            verify_signature(&payload, &format!("t={NOW},v1=not-hex"), SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn completed_event_maps_to_paid() {
        let event = WebhookEvent::parse(&completed_payload()).unwrap();
        assert_eq!(event.id, "evt_1");
        let update = event.checkout_update().unwrap().unwrap();
        assert_eq!(update.settlement, Settlement::Paid);
        assert_eq!(update.session.id, "cs_test_1");
        assert_eq!(update.session.payment_intent.as_deref(), Some("pi_1"));
    }

    #[test]
    fn completed_with_delayed_payment_stays_pending() {
        let payload = serde_json::json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_2", "status": "complete", "payment_status": "unpaid"}}
        })
        .to_string();
        let event = WebhookEvent::parse(payload.as_bytes()).unwrap();
        let update = event.checkout_update().unwrap().unwrap();
        assert_eq!(update.settlement, Settlement::Pending);
    }

    #[test]
    fn expired_and_async_failures_map_to_failed() {
        for event_type in [CHECKOUT_EXPIRED, CHECKOUT_ASYNC_FAILED] {
            let payload = serde_json::json!({
                "id": "evt_3",
                "type": event_type,
                "data": {"object": {"id": "cs_3", "status": "expired", "payment_status": "unpaid"}}
            })
            .to_string();
            let event = WebhookEvent::parse(payload.as_bytes()).unwrap();
            let update = event.checkout_update().unwrap().unwrap();
            assert_eq!(update.settlement, Settlement::Failed, "{event_type}");
        }
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let payload = serde_json::json!({
            "id": "evt_4",
            "type": "customer.created",
            "data": {"object": {"id": "cus_1"}}
        })
        .to_string();
        let event = WebhookEvent::parse(payload.as_bytes()).unwrap();
        assert_matches!(event.checkout_update(), Ok(None));
    }
}
