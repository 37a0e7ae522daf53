//! # Payment Types
//!
//! Inputs and normalized outcomes of gateway operations. Every outcome carries
//! `success` plus a human-readable `message`; failures never escape as errors.

use crate::error::PaymentError;
use crate::money::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Payment data handed to `process_payment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Amount in major units
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
}

impl PaymentRequest {
    pub fn new(amount: Decimal, currency: impl Into<Currency>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            payment_method_id: None,
            order_id: None,
            customer_email: None,
            return_url: None,
            cancel_url: None,
            description: None,
            brand_name: None,
        }
    }

    pub fn with_payment_method(mut self, payment_method_id: impl Into<String>) -> Self {
        self.payment_method_id = Some(payment_method_id.into());
        self
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_redirect_urls(
        mut self,
        return_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        self.return_url = Some(return_url.into());
        self.cancel_url = Some(cancel_url.into());
        self
    }

    /// Activity-log context for this request, with the customer email masked
    pub fn log_context(&self) -> serde_json::Value {
        let mut context = serde_json::to_value(self).unwrap_or_default();
        if let Some(email) = context.get_mut("customer_email") {
            *email = serde_json::Value::from(REDACTED);
        }
        context
    }
}

const REDACTED: &str = "[redacted]";

/// Result of `process_payment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Customer must finish a client-side step (3-D Secure and similar)
    #[serde(default)]
    pub requires_action: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Where to send the buyer to approve the payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
    pub message: String,
}

impl PaymentOutcome {
    pub fn completed(transaction_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            requires_action: false,
            client_secret: None,
            approval_url: None,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            requires_action: false,
            client_secret: None,
            approval_url: None,
            message: message.into(),
        }
    }
}

impl From<PaymentError> for PaymentOutcome {
    fn from(err: PaymentError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Normalized webhook event returned by `verify_payment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookVerification {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookVerification {
    pub fn completed(
        transaction_id: impl Into<String>,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            amount: Some(amount),
            status: Some("completed".to_string()),
            currency: Some(currency),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            amount: None,
            status: None,
            currency: None,
            message: Some(message.into()),
        }
    }
}

impl From<PaymentError> for WebhookVerification {
    fn from(err: PaymentError) -> Self {
        Self::rejected(err.to_string())
    }
}

/// Result of `refund_payment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    pub message: String,
}

impl RefundOutcome {
    pub fn refunded(refund_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            refund_id: Some(refund_id.into()),
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            refund_id: None,
            message: message.into(),
        }
    }
}

impl From<PaymentError> for RefundOutcome {
    fn from(err: PaymentError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Result of `payment_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PaymentStatusReport {
    pub fn found(status: impl Into<String>, amount: Decimal, currency: Currency) -> Self {
        Self {
            success: true,
            status: Some(status.into()),
            amount: Some(amount),
            currency: Some(currency),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: None,
            amount: None,
            currency: None,
            message: Some(message.into()),
        }
    }
}

impl From<PaymentError> for PaymentStatusReport {
    fn from(err: PaymentError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Inbound webhook headers with case-insensitive lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHeaders {
    entries: BTreeMap<String, String>,
}

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Builder: add a header
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for WebhookHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = WebhookHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_log_context_masks_customer_email() {
        let request = PaymentRequest::new(dec!(19.99), "EUR")
            .with_order_id("ord_9")
            .with_customer_email("buyer@example.com");

        let context = request.log_context();
        assert_eq!(context["customer_email"], "[redacted]");
        assert_eq!(context["order_id"], "ord_9");
        assert!(!context.to_string().contains("buyer@example.com"));

        let anonymous = PaymentRequest::new(dec!(5), "USD").log_context();
        assert!(anonymous.get("customer_email").is_none());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: PaymentRequest =
            serde_json::from_value(json!({"amount": "25.50", "order_id": "ord_1"})).unwrap();

        assert_eq!(request.amount, dec!(25.50));
        assert_eq!(request.currency.code(), "USD");
        assert_eq!(request.order_id.as_deref(), Some("ord_1"));
        assert!(request.payment_method_id.is_none());
    }

    #[test]
    fn test_error_becomes_failed_outcome() {
        let outcome = PaymentOutcome::from(PaymentError::GatewayNotFound {
            name: "nonexistent".into(),
        });

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Payment gateway not found: nonexistent");

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("transaction_id").is_none());
        assert_eq!(json["requires_action"], false);
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let headers: WebhookHeaders = [("Stripe-Signature", "t=1,v1=abc")].into_iter().collect();

        assert_eq!(headers.get("stripe-signature"), Some("t=1,v1=abc"));
        assert_eq!(headers.get("STRIPE-SIGNATURE"), Some("t=1,v1=abc"));
        assert_eq!(headers.get("paypal-transmission-id"), None);
    }
}
