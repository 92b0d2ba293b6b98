//! Payment webhook authentication and parsing.
//!
//! The provider signs each delivery with `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>]`
//! where every `v1` is HMAC-SHA256 over `"{t}.{raw body}"` keyed with the endpoint secret.
//! Several `v1` entries appear while a secret is being rolled.

use crate::environment::Clock;
use crate::money::Money;
use chrono::Duration;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Signature check failure. Always answered with 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No signature header
    #[error("signature header missing")]
    Missing,

    /// Header present but unreadable
    #[error("signature header malformed")]
    Malformed,

    /// Timestamp outside the tolerance window
    #[error("signature timestamp outside tolerance")]
    Expired,

    /// No `v1` entry matches
    #[error("signature mismatch")]
    Mismatch,

    /// The configured secret is empty, so any sender could produce a valid MAC
    #[error("webhook secret not configured")]
    InvalidSecret,
}

/// Webhook rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// Authentication failed
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// Authenticated but not a readable event
    #[error("invalid event payload: {0}")]
    Payload(String),
}

/// Hex HMAC of `"{timestamp}.{payload}"`.
///
/// # Errors
///
/// Returns [`SignatureError::InvalidSecret`] if the secret is empty.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = keyed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn keyed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::InvalidSecret);
    }
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks a signature header against the raw body.
///
/// # Errors
///
/// Returns [`SignatureError`] if the secret is empty, the header is malformed or too old
/// relative to `now`, or no `v1` entry matches.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance: Duration,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => candidates.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now.saturating_sub(timestamp) > tolerance.num_seconds() {
        return Err(SignatureError::Expired);
    }

    let mac = keyed_mac(secret, timestamp, payload)?;
    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// A payment intent as reported in an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Intent id (`pi_...`)
    pub id: String,
    /// Amount in cents
    pub amount: Money,
    /// Currency code
    pub currency: String,
    /// Latest charge id
    pub latest_charge: Option<String>,
    /// Metadata set at checkout
    pub metadata: HashMap<String, String>,
    /// Provider failure message
    pub failure_message: Option<String>,
}

/// A refunded charge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargeRefund {
    /// Charge id (`ch_...`)
    pub charge_id: String,
    /// Owning intent, if reported
    pub payment_intent_id: Option<String>,
}

/// Events the reconciliation understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// `payment_intent.succeeded`
    PaymentSucceeded(PaymentIntent),
    /// `payment_intent.payment_failed`
    PaymentFailed(PaymentIntent),
    /// `charge.refunded`
    ChargeRefunded(ChargeRefund),
    /// Anything else, by type name
    Other(String),
}

/// An authenticated webhook event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Provider event id (`evt_...`), the deduplication key
    pub id: String,
    /// Provider type name
    pub event_type: String,
    /// Parsed payload
    pub event: ProviderEvent,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct RawIntent {
    id: String,
    amount: u64,
    currency: String,
    #[serde(default)]
    latest_charge: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    last_payment_error: Option<RawPaymentError>,
}

#[derive(Deserialize)]
struct RawPaymentError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RawCharge {
    id: String,
    #[serde(default)]
    payment_intent: Option<String>,
}

impl From<RawIntent> for PaymentIntent {
    fn from(raw: RawIntent) -> Self {
        Self {
            id: raw.id,
            amount: Money::from_cents(raw.amount),
            currency: raw.currency,
            latest_charge: raw.latest_charge,
            metadata: raw.metadata,
            failure_message: raw.last_payment_error.and_then(|e| e.message),
        }
    }
}

/// Parses an event body.
///
/// # Errors
///
/// Returns [`WebhookError::Payload`] if the JSON does not describe an event, or a known
/// event type carries an unreadable object.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let raw: RawEvent =
        serde_json::from_slice(payload).map_err(|e| WebhookError::Payload(e.to_string()))?;
    let object = raw.data.object;
    let intent = |object: serde_json::Value| {
        serde_json::from_value::<RawIntent>(object)
            .map(PaymentIntent::from)
            .map_err(|e| WebhookError::Payload(e.to_string()))
    };

    let event = match raw.event_type.as_str() {
        "payment_intent.succeeded" => ProviderEvent::PaymentSucceeded(intent(object)?),
        "payment_intent.payment_failed" => ProviderEvent::PaymentFailed(intent(object)?),
        "charge.refunded" => {
            let charge: RawCharge = serde_json::from_value(object)
                .map_err(|e| WebhookError::Payload(e.to_string()))?;
            ProviderEvent::ChargeRefunded(ChargeRefund {
                charge_id: charge.id,
                payment_intent_id: charge.payment_intent,
            })
        }
        other => ProviderEvent::Other(other.to_string()),
    };

    Ok(WebhookEvent {
        id: raw.id,
        event_type: raw.event_type,
        event,
    })
}

/// Authenticates and parses deliveries for one endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
    clock: Arc<dyn Clock>,
}

impl WebhookVerifier {
    /// Creates a verifier. With an empty secret every delivery is rejected.
    #[must_use]
    pub fn new(secret: impl Into<String>, tolerance: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
            clock,
        }
    }

    /// Verifies the signature header, then parses the body. Nothing is parsed before the
    /// signature has been checked.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError`] on any authentication or parsing failure.
    pub fn verify(&self, header: Option<&str>, payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
        let header = header.ok_or(SignatureError::Missing)?;
        verify_signature(
            header,
            payload,
            &self.secret,
            self.clock.now().timestamp(),
            self.tolerance,
        )?;
        parse_event(payload)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_735_689_600;

    fn header_for(payload: &[u8], timestamp: i64) -> String {
        format!("t={timestamp},v1={}", sign(SECRET, timestamp, payload).unwrap())
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let header = header_for(body, NOW);
        assert_eq!(
            verify_signature(&header, body, SECRET, NOW, Duration::seconds(300)),
            Ok(())
        );
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let body = b"{}";
        let good = sign(SECRET, NOW, body).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={good}");
        assert!(verify_signature(&header, body, SECRET, NOW, Duration::seconds(300)).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let header = header_for(b"{\"amount\":100}", NOW);
        assert_eq!(
            verify_signature(&header, b"{\"amount\":1}", SECRET, NOW, Duration::seconds(300)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let body = b"{}";
        let header = header_for(body, NOW - 301);
        assert_eq!(
            verify_signature(&header, body, SECRET, NOW, Duration::seconds(300)),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn rejects_malformed_header() {
        for header in ["", "v1=abc", "t=abc,v1=abc", "t=1735689600"] {
            assert_eq!(
                verify_signature(header, b"{}", SECRET, NOW, Duration::seconds(300)),
                Err(SignatureError::Malformed),
                "{header}"
            );
        }
    }

    #[test]
    fn empty_secret_rejects_empty_key_signatures() {
        let body = br#"{"id":"evt_1","type":"customer.created","data":{"object":{}}}"#;
        let mut mac = HmacSha256::new_from_slice(b"").unwrap();
        mac.update(format!("{NOW}.").as_bytes());
        mac.update(body);
        let forged = format!("t={NOW},v1={}", hex::encode(mac.finalize().into_bytes()));

        assert_eq!(
            verify_signature(&forged, body, "", NOW, Duration::seconds(300)),
            Err(SignatureError::InvalidSecret)
        );
        assert_eq!(sign("", NOW, body), Err(SignatureError::InvalidSecret));
    }

    #[test]
    fn parses_payment_intent_succeeded() {
        let body = serde_json::json!({
            "id": "evt_42",
            "type": "payment_intent.succeeded",
            "data": {"object": {
                "id": "pi_1",
                "amount": 30000,
                "currency": "eur",
                "latest_charge": "ch_1",
                "metadata": {"item_kind": "tour", "item_id": "5"}
            }}
        });
        let event = parse_event(body.to_string().as_bytes()).unwrap();
        assert_eq!(event.id, "evt_42");
        match event.event {
            ProviderEvent::PaymentSucceeded(intent) => {
                assert_eq!(intent.amount, Money::from_cents(30_000));
                assert_eq!(intent.latest_charge.as_deref(), Some("ch_1"));
                assert_eq!(intent.metadata["item_id"], "5");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unknown_types_are_passed_through() {
        let body = br#"{"id":"evt_9","type":"customer.created","data":{"object":{}}}"#;
        assert_eq!(
            parse_event(body).unwrap().event,
            ProviderEvent::Other("customer.created".to_string())
        );
        assert!(matches!(parse_event(b"not json"), Err(WebhookError::Payload(_))));
    }
}
