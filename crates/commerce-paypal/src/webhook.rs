//! # PayPal Webhook Handling
//!
//! Event parsing for `PAYMENT.CAPTURE.COMPLETED` and the request body for
//! PayPal's remote signature verification endpoint.

use commerce_core::{Currency, WebhookHeaders, WebhookVerification};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

/// Event type treated as a completed payment
pub const CAPTURE_COMPLETED: &str = "PAYMENT.CAPTURE.COMPLETED";

/// Signature headers PayPal attaches to every webhook delivery
pub const TRANSMISSION_HEADERS: [(&str, &str); 5] = [
    ("auth_algo", "PAYPAL-AUTH-ALGO"),
    ("cert_url", "PAYPAL-CERT-URL"),
    ("transmission_id", "PAYPAL-TRANSMISSION-ID"),
    ("transmission_sig", "PAYPAL-TRANSMISSION-SIG"),
    ("transmission_time", "PAYPAL-TRANSMISSION-TIME"),
];

/// `{"value": "10.00", "currency_code": "USD"}`
#[derive(Debug, Clone, Deserialize)]
pub struct Money {
    pub value: String,
    pub currency_code: String,
}

impl Money {
    pub fn amount(&self) -> Option<Decimal> {
        self.value.trim().parse().ok()
    }

    pub fn currency(&self) -> Currency {
        Currency::new(&self.currency_code)
    }
}

/// Capture resource from the payments API and capture webhooks
#[derive(Debug, Clone, Deserialize)]
pub struct Capture {
    pub id: String,
    #[serde(default)]
    pub status: String,
    pub amount: Money,
    #[serde(default)]
    pub custom_id: Option<String>,
}

/// `message` from a PayPal error body
pub fn error_message(body: &Value) -> Option<String> {
    body["message"].as_str().map(String::from)
}

/// Normalize a webhook event; only capture completion is recognized
pub fn parse_event(event: &Value) -> WebhookVerification {
    if event["event_type"].as_str() != Some(CAPTURE_COMPLETED) {
        return WebhookVerification::rejected("Invalid webhook data");
    }

    let capture = match serde_json::from_value::<Capture>(event["resource"].clone()) {
        Ok(capture) => capture,
        Err(_) => return WebhookVerification::rejected("Invalid webhook data"),
    };

    match capture.amount.amount() {
        Some(amount) => WebhookVerification::completed(capture.id, amount, capture.amount.currency()),
        None => WebhookVerification::rejected("Invalid webhook data"),
    }
}

/// `resource.custom_id`, set from the order id at checkout
pub fn order_id(event: &Value) -> Option<String> {
    event["resource"]["custom_id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// Body for `POST /v1/notifications/verify-webhook-signature`.
///
/// `None` when a transmission header is missing or the payload is not JSON.
pub fn verification_request(
    webhook_id: &str,
    payload: &[u8],
    headers: &WebhookHeaders,
) -> Option<Value> {
    let event: Value = serde_json::from_slice(payload).ok()?;

    let mut body = json!({
        "webhook_id": webhook_id,
        "webhook_event": event,
    });
    for (field, header) in TRANSMISSION_HEADERS {
        body[field] = Value::String(headers.get(header)?.to_string());
    }
    Some(body)
}
