//! # Stripe Gateway
//!
//! Payment intents with immediate confirmation. A `requires_action` intent
//! is a successful, non-terminal outcome: the returned client secret lets the
//! browser finish authentication.

use crate::config::{self, StripeSettings, DEFAULT_API_BASE_URL};
use crate::webhook::{self, PaymentIntent, SIGNATURE_HEADER};
use async_trait::async_trait;
use commerce_core::{
    ConfigField, ConfigStore, ConfigValidation, Currency, GatewayBase, HttpMethod, HttpTransport,
    LogLevel, PaymentError, PaymentGateway, PaymentOutcome, PaymentRequest, PaymentResult,
    PaymentStatusReport, RefundOutcome, RequestBody, WebhookHeaders, WebhookVerification,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

pub const STRIPE: &str = "stripe";

const PROVIDER: &str = "Stripe";

#[derive(Debug, Deserialize)]
struct Refund {
    id: String,
}

/// Stripe payment gateway
pub struct StripeGateway {
    base: GatewayBase,
    api_base_url: String,
}

impl StripeGateway {
    pub fn new(store: Arc<dyn ConfigStore>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base: GatewayBase::new(STRIPE, "Stripe", store, transport),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn settings(&self) -> PaymentResult<StripeSettings> {
        StripeSettings::from_config(&self.config()).map_err(PaymentError::InvalidConfiguration)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    async fn call(
        &self,
        settings: &StripeSettings,
        method: HttpMethod,
        path: &str,
        form: Vec<(String, String)>,
    ) -> PaymentResult<Value> {
        let body = if form.is_empty() {
            RequestBody::Empty
        } else {
            RequestBody::Form(form)
        };

        self.base
            .request(
                method,
                &self.url(path),
                body,
                vec![("Authorization".to_string(), settings.auth_header())],
            )
            .await
            .into_success(PROVIDER, webhook::error_message)
    }

    async fn fetch_intent(
        &self,
        settings: &StripeSettings,
        transaction_id: &str,
    ) -> PaymentResult<PaymentIntent> {
        let body = self
            .call(
                settings,
                HttpMethod::Get,
                &format!("/payment_intents/{}", transaction_id),
                Vec::new(),
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    #[instrument(skip(self, settings, request), fields(gateway = STRIPE, order_id = ?request.order_id))]
    async fn create_intent(
        &self,
        settings: &StripeSettings,
        request: &PaymentRequest,
    ) -> PaymentResult<PaymentOutcome> {
        let amount = request.currency.to_minor_units(request.amount)?;

        let mut form = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), request.currency.lowercase()),
        ];
        if let Some(payment_method) = &request.payment_method_id {
            form.push(("payment_method".to_string(), payment_method.clone()));
        }
        form.extend([
            ("confirmation_method".to_string(), "manual".to_string()),
            ("confirm".to_string(), "true".to_string()),
            (
                "metadata[order_id]".to_string(),
                request.order_id.clone().unwrap_or_default(),
            ),
            (
                "metadata[customer_email]".to_string(),
                request.customer_email.clone().unwrap_or_default(),
            ),
        ]);

        let body = self
            .call(settings, HttpMethod::Post, "/payment_intents", form)
            .await?;
        let intent: PaymentIntent = serde_json::from_value(body)?;

        Ok(match intent.status.as_str() {
            "succeeded" => {
                self.base.log(
                    LogLevel::Info,
                    "Payment succeeded",
                    &json!({"intent_id": intent.id}),
                );
                PaymentOutcome::completed(intent.id, "Payment processed successfully")
            }
            "requires_action" => PaymentOutcome {
                requires_action: true,
                client_secret: intent.client_secret,
                ..PaymentOutcome::completed(intent.id, "Payment requires additional authentication")
            },
            _ => {
                let reason = intent
                    .last_payment_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Unknown error".to_string());
                PaymentOutcome::failure(format!("Payment failed: {}", reason))
            }
        })
    }

    async fn create_refund(
        &self,
        settings: &StripeSettings,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult<RefundOutcome> {
        let mut form = vec![("payment_intent".to_string(), transaction_id.to_string())];

        if let Some(amount) = amount {
            // minor units depend on the intent's currency
            let currency = self.fetch_intent(settings, transaction_id).await?.currency();
            form.push((
                "amount".to_string(),
                currency.to_minor_units(amount)?.to_string(),
            ));
        }

        let body = self
            .call(settings, HttpMethod::Post, "/refunds", form)
            .await?;
        let refund: Refund = serde_json::from_value(body)?;

        self.base.log(
            LogLevel::Info,
            "Refund successful",
            &json!({"refund_id": refund.id}),
        );
        Ok(RefundOutcome::refunded(refund.id, "Refund processed successfully"))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn base(&self) -> &GatewayBase {
        &self.base
    }

    async fn process_payment(&self, request: &PaymentRequest) -> PaymentOutcome {
        self.base.log(
            LogLevel::Info,
            "Processing Stripe payment",
            &request.log_context(),
        );

        if !self.is_enabled() {
            return PaymentOutcome::failure("Stripe gateway is not enabled");
        }

        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(e) => return e.into(),
        };

        match self.create_intent(&settings, request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.base.log(
                    LogLevel::Error,
                    "Stripe API error",
                    &json!({"error": e.to_string()}),
                );
                PaymentOutcome::failure(format!("Payment processing failed: {}", e))
            }
        }
    }

    fn verify_payment(&self, webhook: &Value) -> WebhookVerification {
        self.base
            .log(LogLevel::Info, "Verifying Stripe payment", webhook);
        webhook::parse_event(webhook)
    }

    async fn refund_payment(&self, transaction_id: &str, amount: Option<Decimal>) -> RefundOutcome {
        self.base.log(
            LogLevel::Info,
            "Processing Stripe refund",
            &json!({"transaction_id": transaction_id, "amount": amount}),
        );

        if !self.is_enabled() {
            return RefundOutcome::failure("Stripe gateway is not enabled");
        }

        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(e) => return e.into(),
        };

        match self.create_refund(&settings, transaction_id, amount).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.base.log(
                    LogLevel::Error,
                    "Refund failed",
                    &json!({"error": e.to_string()}),
                );
                RefundOutcome::failure(format!("Refund failed: {}", e))
            }
        }
    }

    async fn payment_status(&self, transaction_id: &str) -> PaymentStatusReport {
        self.base.log(
            LogLevel::Info,
            "Getting Stripe payment status",
            &json!({"transaction_id": transaction_id}),
        );

        if !self.is_enabled() {
            return PaymentStatusReport::failure("Stripe gateway is not enabled");
        }

        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(e) => return e.into(),
        };

        match self.fetch_intent(&settings, transaction_id).await {
            Ok(intent) => {
                let currency: Currency = intent.currency();
                PaymentStatusReport::found(
                    intent.status,
                    currency.from_minor_units(intent.amount),
                    currency,
                )
            }
            Err(e) => {
                PaymentStatusReport::failure(format!("Failed to get payment status: {}", e))
            }
        }
    }

    fn validate_config(&self) -> ConfigValidation {
        ConfigValidation::from_errors(
            StripeSettings::from_config(&self.config())
                .err()
                .unwrap_or_default(),
        )
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        config::config_fields()
    }

    async fn verify_webhook_signature(&self, payload: &[u8], headers: &WebhookHeaders) -> bool {
        let config = self.config();
        let Some(secret) = commerce_core::ConfigReader::new(&config).text("webhook_secret") else {
            return false;
        };

        match headers.get(SIGNATURE_HEADER) {
            Some(header) => webhook::verify_signature(&secret, payload, header),
            None => false,
        }
    }

    fn webhook_order_id(&self, event: &Value) -> Option<String> {
        webhook::order_id(event)
    }
}
