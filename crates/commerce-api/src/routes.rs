//! # Routes
//!
//! Axum router for checkout payments, webhooks, shipping and admin settings.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Payments:
///   - GET  /api/v1/gateways
///   - POST /api/v1/payments/{gateway}
///   - POST /api/v1/payments/{gateway}/refunds
///   - GET  /api/v1/payments/{gateway}/{transaction_id}
///
/// - Shipping:
///   - GET  /api/v1/shipping/methods
///   - POST /api/v1/shipping/options
///   - POST /api/v1/shipping/{method}
///
/// - Admin:
///   - GET /api/v1/admin/gateways/{name}/fields | /validation
///   - PUT /api/v1/admin/gateways/{name}
///   - GET /api/v1/admin/shipping
///   - GET /api/v1/admin/shipping/{name}/fields | /validation | /status
///   - PUT /api/v1/admin/shipping/{name}
///
/// - Webhooks:
///   - POST /webhook/{gateway}
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let payment_routes = Router::new()
        .route("/gateways", get(handlers::list_gateways))
        .route("/payments/{gateway}", post(handlers::process_payment))
        .route("/payments/{gateway}/refunds", post(handlers::refund_payment))
        .route(
            "/payments/{gateway}/{transaction_id}",
            get(handlers::payment_status),
        );

    let shipping_routes = Router::new()
        .route("/methods", get(handlers::list_shipping_methods))
        .route("/options", post(handlers::shipping_options))
        .route("/{method}", post(handlers::calculate_shipping));

    let admin_routes = Router::new()
        .route(
            "/gateways/{name}",
            axum::routing::put(handlers::update_gateway),
        )
        .route("/gateways/{name}/fields", get(handlers::gateway_fields))
        .route(
            "/gateways/{name}/validation",
            get(handlers::gateway_validation),
        )
        .route("/shipping", get(handlers::shipping_statuses))
        .route(
            "/shipping/{name}",
            axum::routing::put(handlers::update_shipping),
        )
        .route("/shipping/{name}/fields", get(handlers::shipping_fields))
        .route(
            "/shipping/{name}/validation",
            get(handlers::shipping_validation),
        )
        .route("/shipping/{name}/status", get(handlers::shipping_status));

    let api_routes = payment_routes
        .nest("/shipping", shipping_routes)
        .nest("/admin", admin_routes);

    // Webhooks take the raw body for signature checks
    let webhook_routes = Router::new().route("/{gateway}", post(handlers::webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .nest("/webhook", webhook_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{default_gateway_manager, default_shipping_manager, AppConfig};
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use commerce_core::{
        config_map, ConfigStore, GatewayRecord, HttpTransport, MemoryConfigStore,
        ReqwestTransport, ShippingMethodRecord,
    };
    use hmac::{Hmac, Mac};
    use serde_json::{json, Value};
    use sha2::Sha256;
    use std::sync::Arc;

    fn store() -> Arc<MemoryConfigStore> {
        Arc::new(
            MemoryConfigStore::new()
                .with_gateway(GatewayRecord::new(
                    "stripe",
                    true,
                    config_map([
                        ("secret_key", "sk_test_123"),
                        ("publishable_key", "pk_test_123"),
                        ("webhook_secret", "whsec_test"),
                    ]),
                ))
                .with_shipping_method(ShippingMethodRecord::new(
                    "flat_rate",
                    "Flat Rate Shipping",
                    true,
                    config_map([("cost", "7.50"), ("free_shipping_threshold", "100")]),
                ))
                .with_shipping_method(ShippingMethodRecord::new(
                    "weight_based",
                    "Weight-Based Shipping",
                    true,
                    config_map([("base_cost", "2.00"), ("cost_per_kg", "1.00")]),
                )),
        )
    }

    fn server_with(store: Arc<MemoryConfigStore>) -> TestServer {
        let store: Arc<dyn ConfigStore> = store;
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new().unwrap());
        let state = AppState::with_managers(
            default_gateway_manager(store.clone(), transport),
            default_shipping_manager(store),
            AppConfig::default(),
        );
        TestServer::new(create_router(state)).unwrap()
    }

    fn server() -> TestServer {
        server_with(store())
    }

    fn sign(secret: &str, payload: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn cart() -> Value {
        json!({
            "items": [
                {"product_id": "tee", "quantity": 2, "price_at_purchase": "20.00", "weight": "1.5"}
            ],
            "address": {"country": "us", "state": "CA", "city": "Oakland", "postal_code": "94612"}
        })
    }

    #[tokio::test]
    async fn test_health() {
        let response = server().get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "fearless-commerce");
    }

    #[tokio::test]
    async fn test_enabled_gateways() {
        let body: Value = server().get("/api/v1/gateways").await.json();

        assert_eq!(body["count"], 1);
        assert_eq!(body["gateways"][0]["name"], "stripe");
        assert_eq!(body["gateways"][0]["webhook_path"], "/webhook/stripe");
    }

    #[tokio::test]
    async fn test_unknown_gateway() {
        let response = server()
            .post("/api/v1/payments/square")
            .json(&json!({"amount": "10.00"}))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "Payment gateway not found: square");
    }

    #[tokio::test]
    async fn test_disabled_gateway() {
        let response = server()
            .post("/api/v1/payments/paypal")
            .json(&json!({"amount": "10.00", "currency": "USD"}))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "Payment gateway is not enabled: paypal");
    }

    #[tokio::test]
    async fn test_shipping_options_sorted_by_cost() {
        let response = server().post("/api/v1/shipping/options").json(&cart()).await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["count"], 2);
        // weight-based: 2.00 + 3kg * 1.00 = 5.00, flat rate 7.50
        assert_eq!(body["options"][0]["method"], "weight_based");
        assert_eq!(body["options"][0]["cost"], "5.00");
        assert_eq!(body["options"][1]["method"], "flat_rate");
        assert_eq!(body["options"][1]["estimated_days"], 3);
    }

    #[tokio::test]
    async fn test_single_shipping_method() {
        let server = server();

        let body: Value = server.post("/api/v1/shipping/flat_rate").json(&cart()).await.json();
        assert_eq!(body["available"], true);
        assert_eq!(body["cost"], "7.50");

        let response = server.post("/api/v1/shipping/courier").json(&cart()).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stripe_webhook() {
        let payload = json!({
            "type": "payment_intent.succeeded",
            "data": {"object": {
                "id": "pi_42",
                "amount": 2599,
                "currency": "usd",
                "status": "succeeded",
                "metadata": {"order_id": "ord_42"}
            }}
        })
        .to_string();
        let signature = format!("t=1700000000,v1={}", sign("whsec_test", &payload));

        let response = server()
            .post("/webhook/stripe")
            .add_header(
                HeaderName::from_static("stripe-signature"),
                HeaderValue::from_str(&signature).unwrap(),
            )
            .text(payload)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["received"], true);
        assert_eq!(body["order_id"], "ord_42");
        assert_eq!(body["verification"]["success"], true);
        assert_eq!(body["verification"]["transaction_id"], "pi_42");
    }

    #[tokio::test]
    async fn test_webhook_bad_signature() {
        let response = server()
            .post("/webhook/stripe")
            .add_header(
                HeaderName::from_static("stripe-signature"),
                HeaderValue::from_static("t=1,v1=deadbeef"),
            )
            .text(r#"{"type":"payment_intent.succeeded"}"#)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_shipping_statuses() {
        let body: Value = server().get("/api/v1/admin/shipping").await.json();

        assert_eq!(body["methods"][0]["name"], "flat_rate");
        assert_eq!(body["methods"][0]["valid_config"], true);
        assert_eq!(body["methods"][1]["name"], "weight_based");
    }

    #[tokio::test]
    async fn test_admin_gateway_fields_and_validation() {
        let server = server();

        let body: Value = server.get("/api/v1/admin/gateways/paypal/fields").await.json();
        let names: Vec<_> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["client_id", "client_secret", "mode", "webhook_id"]);

        let body: Value = server.get("/api/v1/admin/gateways/paypal/validation").await.json();
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn test_admin_update_persists() {
        let store = store();
        let server = server_with(store.clone());

        let response = server
            .put("/api/v1/admin/shipping/flat_rate")
            .json(&json!({"enabled": false, "config": {"cost": "-1"}}))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["enabled"], false);
        assert_eq!(body["valid_config"], false);
        assert_eq!(
            store.load_shipping_method("flat_rate").unwrap().unwrap().config["cost"],
            "-1"
        );

        let response = server
            .put("/api/v1/admin/gateways/stripe")
            .json(&json!({"enabled": false}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["enabled"], false);
        assert_eq!(body["validation"]["valid"], true);
    }

    #[tokio::test]
    async fn test_admin_unknown_method() {
        let response = server()
            .put("/api/v1/admin/shipping/courier")
            .json(&json!({"enabled": true}))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"], "Shipping method not found: courier");
    }
}
