//! # Request Handlers
//!
//! Axum request handlers for checkout payments, provider webhooks, shipping
//! quotes and the admin settings screens.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use commerce_core::{
    Address, CartItem, ConfigMap, PaymentError, PaymentOutcome, PaymentRequest,
    PaymentStatusReport, RefundOutcome, ShippingCalculation, WebhookHeaders,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Refund request
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub transaction_id: String,
    /// Omit for a full refund
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Cart and destination for shipping quotes
#[derive(Debug, Deserialize)]
pub struct ShippingRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub address: Address,
}

/// Admin settings update; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub config: Option<ConfigMap>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn save_failed() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Failed to save settings", 500)),
    )
}

/// 200 for a successful outcome, 422 otherwise
fn outcome_status(success: bool) -> StatusCode {
    if success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

fn require_gateway(state: &AppState, name: &str, enabled: bool) -> Result<(), ApiError> {
    let gateway = state.gateways.get(name).ok_or_else(|| {
        payment_error_to_response(PaymentError::GatewayNotFound {
            name: name.to_string(),
        })
    })?;

    if enabled && !gateway.is_enabled() {
        return Err(payment_error_to_response(PaymentError::GatewayDisabled {
            name: name.to_string(),
        }));
    }
    Ok(())
}

fn require_shipping_method(state: &AppState, name: &str) -> Result<(), ApiError> {
    match state.shipping.get(name) {
        Some(_) => Ok(()),
        None => Err(payment_error_to_response(
            PaymentError::ShippingMethodNotFound {
                name: name.to_string(),
            },
        )),
    }
}

fn header_map_to_webhook_headers(headers: &HeaderMap) -> WebhookHeaders {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "fearless-commerce",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Enabled gateways, for the checkout page
pub async fn list_gateways(State(state): State<AppState>) -> impl IntoResponse {
    let gateways: Vec<_> = state
        .gateways
        .enabled_gateways()
        .into_iter()
        .map(|g| {
            json!({
                "name": g.name(),
                "display_name": g.display_name(),
                "webhook_path": g.webhook_path(),
            })
        })
        .collect();

    Json(json!({
        "gateways": gateways,
        "count": gateways.len()
    }))
}

/// Take a payment through a gateway
#[instrument(skip(state, request), fields(gateway = %gateway))]
pub async fn process_payment(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentOutcome>), ApiError> {
    require_gateway(&state, &gateway, true)?;

    let outcome = state.gateways.process_payment(&gateway, &request).await;
    if outcome.success {
        info!(transaction_id = ?outcome.transaction_id, "Payment accepted");
    } else {
        warn!(message = %outcome.message, "Payment failed");
    }

    Ok((outcome_status(outcome.success), Json(outcome)))
}

/// Refund all or part of a payment
#[instrument(skip(state, request), fields(gateway = %gateway, transaction_id = %request.transaction_id))]
pub async fn refund_payment(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    Json(request): Json<RefundRequest>,
) -> Result<(StatusCode, Json<RefundOutcome>), ApiError> {
    require_gateway(&state, &gateway, true)?;

    let outcome = state
        .gateways
        .refund_payment(&gateway, &request.transaction_id, request.amount)
        .await;

    Ok((outcome_status(outcome.success), Json(outcome)))
}

/// Provider-side status of a transaction
pub async fn payment_status(
    State(state): State<AppState>,
    Path((gateway, transaction_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<PaymentStatusReport>), ApiError> {
    require_gateway(&state, &gateway, false)?;

    let report = state
        .gateways
        .payment_status(&gateway, &transaction_id)
        .await;

    Ok((outcome_status(report.success), Json(report)))
}

/// Provider webhook: signature, then event parsing.
///
/// Unrecognized events are acknowledged with `verification.success: false`
/// so the provider does not retry them.
#[instrument(skip(state, headers, body), fields(gateway = %gateway))]
pub async fn webhook(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    require_gateway(&state, &gateway, false)?;

    let webhook_headers = header_map_to_webhook_headers(&headers);
    if !state
        .gateways
        .verify_webhook_signature(&gateway, &body, &webhook_headers)
        .await
    {
        error!("Webhook signature verification failed");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid webhook signature", 401)),
        ));
    }

    let event: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid webhook payload", 400).with_details(e.to_string())),
        )
    })?;

    let verification = state.gateways.verify_payment(&gateway, &event);
    let order_id = state.gateways.webhook_order_id(&gateway, &event);

    info!(
        success = verification.success,
        transaction_id = ?verification.transaction_id,
        order_id = ?order_id,
        "Received webhook"
    );

    Ok(Json(json!({
        "received": true,
        "verification": verification,
        "order_id": order_id,
    })))
}

/// Enabled shipping methods
pub async fn list_shipping_methods(State(state): State<AppState>) -> impl IntoResponse {
    let methods: Vec<_> = state
        .shipping
        .enabled_shipping_methods()
        .into_iter()
        .map(|m| json!({"name": m.name(), "display_name": m.display_name()}))
        .collect();

    Json(json!({
        "methods": methods,
        "count": methods.len()
    }))
}

/// Every available quote, cheapest first
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn shipping_options(
    State(state): State<AppState>,
    Json(request): Json<ShippingRequest>,
) -> impl IntoResponse {
    let options = state
        .shipping
        .calculate_shipping_options(&request.items, &request.address);

    Json(json!({
        "options": options,
        "count": options.len()
    }))
}

/// Quote from one method
pub async fn calculate_shipping(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Json(request): Json<ShippingRequest>,
) -> Result<Json<ShippingCalculation>, ApiError> {
    require_shipping_method(&state, &method)?;

    Ok(Json(state.shipping.calculate_shipping(
        &method,
        &request.items,
        &request.address,
    )))
}

// =============================================================================
// Admin
// =============================================================================

pub async fn gateway_fields(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_gateway(&state, &name, false)?;

    Ok(Json(json!({
        "gateway": name,
        "fields": state.gateways.config_fields(&name),
    })))
}

pub async fn gateway_validation(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_gateway(&state, &name, false)?;
    Ok(Json(state.gateways.validate_config(&name)))
}

/// Save config and/or the enabled flag; responds with the new validation
#[instrument(skip(state, request), fields(gateway = %name))]
pub async fn update_gateway(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(config) = request.config {
        if !state
            .gateways
            .set_gateway_config(&name, config)
            .map_err(payment_error_to_response)?
        {
            return Err(save_failed());
        }
    }
    if let Some(enabled) = request.enabled {
        if !state
            .gateways
            .set_gateway_enabled(&name, enabled)
            .map_err(payment_error_to_response)?
        {
            return Err(save_failed());
        }
    }
    require_gateway(&state, &name, false)?;

    info!("Gateway settings updated");
    let enabled = state.gateways.get(&name).map(|g| g.is_enabled());
    Ok(Json(json!({
        "name": name,
        "enabled": enabled,
        "validation": state.gateways.validate_config(&name),
    })))
}

pub async fn shipping_statuses(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "methods": state.shipping.all_shipping_method_statuses()
    }))
}

pub async fn shipping_fields(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_shipping_method(&state, &name)?;

    Ok(Json(json!({
        "method": name,
        "fields": state.shipping.config_fields(&name),
    })))
}

pub async fn shipping_validation(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_shipping_method(&state, &name)?;
    Ok(Json(state.shipping.validate_config(&name)))
}

pub async fn shipping_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_shipping_method(&state, &name)?;
    Ok(Json(state.shipping.method_status(&name)))
}

#[instrument(skip(state, request), fields(method = %name))]
pub async fn update_shipping(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(config) = request.config {
        if !state
            .shipping
            .set_method_config(&name, config)
            .map_err(payment_error_to_response)?
        {
            return Err(save_failed());
        }
    }
    if let Some(enabled) = request.enabled {
        if !state
            .shipping
            .set_method_enabled(&name, enabled)
            .map_err(payment_error_to_response)?
        {
            return Err(save_failed());
        }
    }
    require_shipping_method(&state, &name)?;

    info!("Shipping method settings updated");
    Ok(Json(state.shipping.method_status(&name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("more");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("more"));
    }

    #[test]
    fn test_payment_error_conversion() {
        let (status, Json(body)) = payment_error_to_response(PaymentError::GatewayNotFound {
            name: "square".to_string(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Payment gateway not found: square");

        let (status, _) = payment_error_to_response(PaymentError::ShippingMethodDisabled {
            name: "flat_rate".to_string(),
        });
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_headers_are_copied() {
        let mut headers = HeaderMap::new();
        headers.insert("Stripe-Signature", "t=1,v1=abc".parse().unwrap());
        let webhook_headers = header_map_to_webhook_headers(&headers);
        assert_eq!(webhook_headers.get("stripe-signature"), Some("t=1,v1=abc"));
    }
}
