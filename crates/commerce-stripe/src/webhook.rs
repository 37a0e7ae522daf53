//! # Stripe Webhook Handling
//!
//! Signature verification for the `Stripe-Signature` header and parsing of
//! the payment intent objects carried by webhook events.

use commerce_core::{Currency, WebhookVerification};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Event type treated as a completed payment
pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

/// Payment intent as returned by the API and embedded in events
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<StripeErrorDetail>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl PaymentIntent {
    pub fn currency(&self) -> Currency {
        Currency::new(&self.currency)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    pub message: Option<String>,
}

/// `error.message` from a Stripe error body
pub fn error_message(body: &Value) -> Option<String> {
    body["error"]["message"].as_str().map(String::from)
}

/// Components of a `t=...,v1=...` signature header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: Option<String>,
    pub v1: Option<String>,
}

/// Split a comma-separated `k=v` header; malformed elements are skipped
pub fn parse_signature_header(header: &str) -> SignatureHeader {
    header
        .split(',')
        .filter_map(|element| element.split_once('='))
        .fold(SignatureHeader::default(), |mut parsed, (key, value)| {
            match key.trim() {
                "t" => parsed.timestamp = Some(value.trim().to_string()),
                "v1" => parsed.v1 = Some(value.trim().to_string()),
                _ => {}
            }
            parsed
        })
}

/// Hex HMAC-SHA256 of `payload` keyed by `secret`
pub fn compute_signature(secret: &str, payload: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check the `v1` signature over the raw payload in constant time.
///
/// False when the secret is empty, `v1` is absent, or it is not valid hex.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let Some(v1) = parse_signature_header(header).v1 else {
        return false;
    };
    let Ok(expected) = hex::decode(v1) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Normalize a webhook event; only `payment_intent.succeeded` is recognized
pub fn parse_event(event: &Value) -> WebhookVerification {
    if event["type"].as_str() != Some(PAYMENT_SUCCEEDED) {
        return WebhookVerification::rejected("Invalid webhook data");
    }

    match serde_json::from_value::<PaymentIntent>(event["data"]["object"].clone()) {
        Ok(intent) => {
            let currency = intent.currency();
            WebhookVerification::completed(
                intent.id,
                currency.from_minor_units(intent.amount),
                currency,
            )
        }
        Err(_) => WebhookVerification::rejected("Invalid webhook data"),
    }
}

/// `data.object.metadata.order_id`, when present and non-empty
pub fn order_id(event: &Value) -> Option<String> {
    event["data"]["object"]["metadata"]["order_id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(String::from)
}
