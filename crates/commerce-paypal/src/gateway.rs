//! # PayPal Gateway
//!
//! Orders API v2. Without a payment method the order is returned with its
//! approval link for a browser redirect; with one, the order is captured
//! right away. Access tokens come from the client-credentials grant and are
//! cached until shortly before they expire.

use crate::config::{self, PayPalSettings};
use crate::token::{AccessToken, TokenCache, TokenResponse};
use crate::webhook::{self, Capture};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use commerce_core::{
    two_decimal_string, ConfigField, ConfigMap, ConfigStore, ConfigValidation, Currency,
    GatewayBase, HttpMethod, HttpOutcome, HttpTransport, LogLevel, PaymentError, PaymentGateway,
    PaymentOutcome, PaymentRequest, PaymentResult, PaymentStatusReport, RefundOutcome,
    RequestBody, WebhookHeaders, WebhookVerification,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

pub const PAYPAL: &str = "paypal";

const PROVIDER: &str = "PayPal";

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct Order {
    id: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Default, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    payments: Payments,
}

#[derive(Debug, Default, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<CaptureSummary>,
}

#[derive(Debug, Deserialize)]
struct CaptureSummary {
    id: String,
    #[serde(default)]
    status: String,
}

impl Order {
    /// Id and status of the first capture, falling back to the order's own
    /// when the response carries no capture
    fn capture_result(&self) -> (Option<&str>, &str) {
        match self
            .purchase_units
            .first()
            .and_then(|unit| unit.payments.captures.first())
        {
            Some(capture) => (Some(capture.id.as_str()), capture.status.as_str()),
            None => (self.id.as_deref(), self.status.as_str()),
        }
    }

    fn approval_url(&self) -> Option<String> {
        self.links
            .iter()
            .find(|link| link.rel == "approve")
            .map(|link| link.href.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Refund {
    id: String,
}

/// Failure message for a provider rejection at `stage`; anything else is a
/// processing failure
fn stage_failure(stage: &str, err: &PaymentError) -> String {
    match err {
        PaymentError::ProviderError { .. } => format!("{}: {}", stage, err),
        _ => format!("Payment processing failed: {}", err),
    }
}

/// PayPal payment gateway
pub struct PayPalGateway {
    base: GatewayBase,
    tokens: TokenCache,
    api_base_url: Option<String>,
}

impl PayPalGateway {
    pub fn new(store: Arc<dyn ConfigStore>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base: GatewayBase::new(PAYPAL, "PayPal", store, transport),
            tokens: TokenCache::default(),
            api_base_url: None,
        }
    }

    /// Builder: override the mode-selected API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    fn settings(&self) -> PaymentResult<PayPalSettings> {
        PayPalSettings::from_config(&self.config()).map_err(PaymentError::InvalidConfiguration)
    }

    fn url(&self, settings: &PayPalSettings, path: &str) -> String {
        let base = self
            .api_base_url
            .as_deref()
            .unwrap_or_else(|| settings.mode.api_base_url());
        format!("{}{}", base, path)
    }

    /// Cached bearer token, or a fresh one from the token endpoint
    async fn access_token(&self, settings: &PayPalSettings) -> PaymentResult<String> {
        if let Some(token) = self.tokens.current(Utc::now()) {
            return Ok(token);
        }

        let credentials = STANDARD.encode(format!(
            "{}:{}",
            settings.client_id, settings.client_secret
        ));
        let outcome = self
            .base
            .request(
                HttpMethod::Post,
                &self.url(settings, "/v1/oauth2/token"),
                RequestBody::Form(vec![(
                    "grant_type".to_string(),
                    "client_credentials".to_string(),
                )]),
                vec![("Authorization".to_string(), format!("Basic {}", credentials))],
            )
            .await;

        let response = match &outcome {
            HttpOutcome::Success { body, .. } => {
                serde_json::from_value::<TokenResponse>(body.clone()).ok()
            }
            _ => None,
        };
        let Some(response) = response else {
            self.base.log(
                LogLevel::Error,
                "PayPal authentication failed",
                &json!({"status": outcome_status(&outcome)}),
            );
            return Err(PaymentError::Authentication {
                provider: PROVIDER.to_string(),
            });
        };

        let token = AccessToken::from_response(response, Utc::now());
        let value = token.token.clone();
        self.tokens.store(token);
        Ok(value)
    }

    async fn call(
        &self,
        settings: &PayPalSettings,
        token: &str,
        method: HttpMethod,
        path: &str,
        body: RequestBody,
    ) -> PaymentResult<Value> {
        self.base
            .request(
                method,
                &self.url(settings, path),
                body,
                vec![("Authorization".to_string(), format!("Bearer {}", token))],
            )
            .await
            .into_success(PROVIDER, webhook::error_message)
    }

    async fn fetch_capture(
        &self,
        settings: &PayPalSettings,
        token: &str,
        capture_id: &str,
    ) -> PaymentResult<Capture> {
        let body = self
            .call(
                settings,
                token,
                HttpMethod::Get,
                &format!("/v2/payments/captures/{}", capture_id),
                RequestBody::Empty,
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    #[instrument(skip(self, settings, token, request), fields(gateway = PAYPAL, order_id = ?request.order_id))]
    async fn create_order(
        &self,
        settings: &PayPalSettings,
        token: &str,
        request: &PaymentRequest,
    ) -> PaymentResult<Order> {
        let order = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": request.currency.code(),
                    "value": two_decimal_string(request.amount),
                },
                "description": request.description.as_deref().unwrap_or("Order payment"),
                "custom_id": request.order_id.as_deref().unwrap_or_default(),
            }],
            "application_context": {
                "return_url": request.return_url.as_deref().unwrap_or_default(),
                "cancel_url": request.cancel_url.as_deref().unwrap_or_default(),
                "brand_name": request.brand_name.as_deref().unwrap_or("FearlessCommerce"),
            }
        });

        let body = self
            .call(
                settings,
                token,
                HttpMethod::Post,
                "/v2/checkout/orders",
                RequestBody::Json(order),
            )
            .await?;
        let order: Order = serde_json::from_value(body)?;

        match order.id {
            Some(_) => Ok(order),
            None => Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: "Unknown error".to_string(),
            }),
        }
    }

    async fn capture_order(
        &self,
        settings: &PayPalSettings,
        token: &str,
        order_id: &str,
    ) -> PaymentResult<Order> {
        let body = self
            .call(
                settings,
                token,
                HttpMethod::Post,
                &format!("/v2/checkout/orders/{}/capture", order_id),
                RequestBody::Json(json!({})),
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn checkout(
        &self,
        settings: &PayPalSettings,
        token: &str,
        request: &PaymentRequest,
    ) -> PaymentOutcome {
        let order = match self.create_order(settings, token, request).await {
            Ok(order) => order,
            Err(e) => {
                self.base.log(
                    LogLevel::Error,
                    "PayPal order creation failed",
                    &json!({"error": e.to_string()}),
                );
                return PaymentOutcome::failure(stage_failure("Order creation failed", &e));
            }
        };
        let order_id = order.id.clone().unwrap_or_default();

        if request.payment_method_id.is_none() {
            self.base.log(
                LogLevel::Info,
                "PayPal order created",
                &json!({"order_id": order_id}),
            );
            return PaymentOutcome {
                approval_url: order.approval_url(),
                ..PaymentOutcome::completed(order_id, "Order created successfully")
            };
        }

        match self.capture_order(settings, token, &order_id).await {
            Ok(capture) => match capture.capture_result() {
                (Some(id), "COMPLETED") => {
                    self.base.log(
                        LogLevel::Info,
                        "PayPal payment captured",
                        &json!({"capture_id": id}),
                    );
                    PaymentOutcome::completed(id, "Payment captured successfully")
                }
                (Some(_), status) => {
                    PaymentOutcome::failure(format!("Payment capture failed: {}", status))
                }
                (None, _) => PaymentOutcome::failure("Payment capture failed: Unknown error"),
            },
            Err(e) => {
                self.base.log(
                    LogLevel::Error,
                    "PayPal capture failed",
                    &json!({"error": e.to_string()}),
                );
                PaymentOutcome::failure(stage_failure("Payment capture failed", &e))
            }
        }
    }

    async fn create_refund(
        &self,
        settings: &PayPalSettings,
        token: &str,
        capture_id: &str,
        amount: Option<Decimal>,
    ) -> PaymentResult<RefundOutcome> {
        let body = match amount {
            Some(amount) => {
                let currency = match self.fetch_capture(settings, token, capture_id).await {
                    Ok(capture) => capture.amount.currency(),
                    Err(e) => {
                        self.base.log(
                            LogLevel::Warn,
                            "Could not look up capture currency, using USD",
                            &json!({"error": e.to_string()}),
                        );
                        Currency::default()
                    }
                };
                json!({
                    "amount": {
                        "value": two_decimal_string(amount),
                        "currency_code": currency.code(),
                    }
                })
            }
            None => json!({}),
        };

        let body = self
            .call(
                settings,
                token,
                HttpMethod::Post,
                &format!("/v2/payments/captures/{}/refund", capture_id),
                RequestBody::Json(body),
            )
            .await?;
        let refund: Refund = serde_json::from_value(body)?;

        self.base.log(
            LogLevel::Info,
            "PayPal refund processed",
            &json!({"refund_id": refund.id}),
        );
        Ok(RefundOutcome::refunded(refund.id, "Refund processed successfully"))
    }

    /// Enabled check, settings, then a token; any failure is the early outcome
    async fn prepare<T, F>(&self, disabled: F) -> Result<(PayPalSettings, String), T>
    where
        T: From<PaymentError>,
        F: FnOnce(&'static str) -> T + Send,
    {
        if !self.is_enabled() {
            return Err(disabled("PayPal gateway is not enabled"));
        }
        let settings = self.settings()?;
        let token = self.access_token(&settings).await?;
        Ok((settings, token))
    }
}

fn outcome_status(outcome: &HttpOutcome) -> Value {
    match outcome {
        HttpOutcome::Transport(message) => json!(message),
        other => json!(other.status()),
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    fn base(&self) -> &GatewayBase {
        &self.base
    }

    /// New credentials invalidate the cached token
    fn set_config(&self, config: ConfigMap) -> bool {
        self.tokens.clear();
        self.base.set_config(config)
    }

    fn reload(&self) -> bool {
        self.tokens.clear();
        self.base.reload()
    }

    async fn process_payment(&self, request: &PaymentRequest) -> PaymentOutcome {
        self.base.log(
            LogLevel::Info,
            "Processing PayPal payment",
            &request.log_context(),
        );

        match self.prepare(PaymentOutcome::failure).await {
            Ok((settings, token)) => self.checkout(&settings, &token, request).await,
            Err(outcome) => outcome,
        }
    }

    fn verify_payment(&self, webhook: &Value) -> WebhookVerification {
        self.base
            .log(LogLevel::Info, "Verifying PayPal payment", webhook);
        webhook::parse_event(webhook)
    }

    async fn refund_payment(&self, transaction_id: &str, amount: Option<Decimal>) -> RefundOutcome {
        self.base.log(
            LogLevel::Info,
            "Processing PayPal refund",
            &json!({"transaction_id": transaction_id, "amount": amount}),
        );

        let (settings, token) = match self.prepare(RefundOutcome::failure).await {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };

        match self
            .create_refund(&settings, &token, transaction_id, amount)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.base.log(
                    LogLevel::Error,
                    "PayPal refund failed",
                    &json!({"error": e.to_string()}),
                );
                RefundOutcome::failure(format!("Refund failed: {}", e))
            }
        }
    }

    async fn payment_status(&self, transaction_id: &str) -> PaymentStatusReport {
        self.base.log(
            LogLevel::Info,
            "Getting PayPal payment status",
            &json!({"transaction_id": transaction_id}),
        );

        let (settings, token) = match self.prepare(PaymentStatusReport::failure).await {
            Ok(prepared) => prepared,
            Err(report) => return report,
        };

        let capture = self
            .fetch_capture(&settings, &token, transaction_id)
            .await
            .and_then(|capture| match capture.amount.amount() {
                Some(amount) => Ok((capture.status, amount, capture.amount.currency())),
                None => Err(PaymentError::Serialization(format!(
                    "invalid amount: {}",
                    capture.amount.value
                ))),
            });

        match capture {
            Ok((status, amount, currency)) => PaymentStatusReport::found(status, amount, currency),
            Err(e) => {
                PaymentStatusReport::failure(format!("Failed to get payment status: {}", e))
            }
        }
    }

    fn validate_config(&self) -> ConfigValidation {
        ConfigValidation::from_errors(
            PayPalSettings::from_config(&self.config())
                .err()
                .unwrap_or_default(),
        )
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        config::config_fields()
    }

    async fn verify_webhook_signature(&self, payload: &[u8], headers: &WebhookHeaders) -> bool {
        let Ok(settings) = self.settings() else {
            return false;
        };
        let Some(webhook_id) = settings.webhook_id.as_deref() else {
            self.base.log(
                LogLevel::Warn,
                "PayPal webhook_id is not configured; rejecting webhook",
                &Value::Null,
            );
            return false;
        };
        let Some(request) = webhook::verification_request(webhook_id, payload, headers) else {
            return false;
        };
        let Ok(token) = self.access_token(&settings).await else {
            return false;
        };

        match self
            .call(
                &settings,
                &token,
                HttpMethod::Post,
                "/v1/notifications/verify-webhook-signature",
                RequestBody::Json(request),
            )
            .await
        {
            Ok(body) => body["verification_status"].as_str() == Some("SUCCESS"),
            Err(e) => {
                self.base.log(
                    LogLevel::Error,
                    "PayPal signature verification failed",
                    &json!({"error": e.to_string()}),
                );
                false
            }
        }
    }

    fn webhook_order_id(&self, event: &Value) -> Option<String> {
        webhook::order_id(event)
    }
}
