//! # Payment Gateways
//!
//! The [`PaymentGateway`] capability trait, the shared [`GatewayBase`] every
//! strategy composes, and the [`GatewayManager`] registry that dispatches by
//! gateway name.
//!
//! ```text
//!                 GatewayManager
//!          ┌──────────┴──────────┐
//!          │  not found? disabled? │
//!          └──────────┬──────────┘
//!                     ▼
//!          PaymentGateway (trait)
//!      ┌──────────────┴──────────────┐
//!  StripeGateway               PayPalGateway
//!      └────── GatewayBase ──────────┘
//!        record · store · transport · log
//! ```

use crate::activity::{self, LogLevel};
use crate::config::{self, ConfigError, ConfigField, ConfigMap, ConfigValidation, GatewayRecord};
use crate::error::{PaymentError, PaymentResult};
use crate::http::{self, HttpMethod, HttpOutcome, HttpTransport, RequestBody};
use crate::payment::{
    PaymentOutcome, PaymentRequest, PaymentStatusReport, RefundOutcome, WebhookHeaders,
    WebhookVerification,
};
use crate::store::ConfigStore;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// State and helpers shared by every gateway strategy.
///
/// Holds the cached [`GatewayRecord`]; every mutation is written back to the
/// [`ConfigStore`] immediately.
pub struct GatewayBase {
    name: String,
    display_name: String,
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn HttpTransport>,
    record: RwLock<GatewayRecord>,
}

impl GatewayBase {
    /// Create the base and load the persisted record.
    ///
    /// A missing record (or a store that cannot be read) leaves the gateway
    /// disabled with an empty config.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        store: Arc<dyn ConfigStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let name = name.into();
        let record = load_record(store.as_ref(), &name);

        Self {
            name,
            display_name: display_name.into(),
            store,
            transport,
            record: RwLock::new(record),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_enabled(&self) -> bool {
        self.record().enabled
    }

    pub fn config(&self) -> ConfigMap {
        self.record().config.clone()
    }

    /// Replace the config and persist it. Returns whether the write succeeded.
    pub fn set_config(&self, config: ConfigMap) -> bool {
        self.update(|record| record.config = config)
    }

    /// Toggle the enabled flag and persist it. Returns whether the write succeeded.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.update(|record| record.enabled = enabled)
    }

    /// Re-read the record from the store
    pub fn reload(&self) -> bool {
        match self.store.load_gateway(&self.name) {
            Ok(record) => {
                *self.record.write().unwrap_or_else(PoisonError::into_inner) =
                    record.unwrap_or_else(|| GatewayRecord::disabled(&self.name));
                true
            }
            Err(e) => {
                tracing::warn!(gateway = %self.name, error = %e, "Failed to reload gateway record");
                false
            }
        }
    }

    /// Emit a strategy activity event (visible only with the debug flag on)
    pub fn log(&self, level: LogLevel, message: &str, context: &Value) {
        activity::gateway_event(level, &self.name, message, context);
    }

    /// `Field '<f>' is required` for each missing field, in input order
    pub fn required_field_errors(&self, fields: &[&str]) -> Vec<ConfigError> {
        config::required_field_errors(&self.record().config, fields)
    }

    /// Send a provider request through the gateway's transport
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: RequestBody,
        headers: Vec<(String, String)>,
    ) -> HttpOutcome {
        http::make_http_request(self.transport.as_ref(), method, url, body, headers).await
    }

    fn record(&self) -> RwLockReadGuard<'_, GatewayRecord> {
        self.record.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached record only changes once the store accepted the write
    fn update(&self, apply: impl FnOnce(&mut GatewayRecord)) -> bool {
        let mut record = self.record.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = record.clone();
        apply(&mut updated);

        match self.store.save_gateway(&updated) {
            Ok(()) => {
                *record = updated;
                true
            }
            Err(e) => {
                tracing::warn!(gateway = %self.name, error = %e, "Failed to save gateway record");
                false
            }
        }
    }
}

fn load_record(store: &dyn ConfigStore, name: &str) -> GatewayRecord {
    match store.load_gateway(name) {
        Ok(Some(record)) => record,
        Ok(None) => GatewayRecord::disabled(name),
        Err(e) => {
            tracing::warn!(gateway = %name, error = %e, "Failed to load gateway record");
            GatewayRecord::disabled(name)
        }
    }
}

/// Capability contract for payment providers.
///
/// Operations return normalized outcomes; implementations must check
/// `is_enabled()` and their own configuration before any network call.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Shared state and helpers
    fn base(&self) -> &GatewayBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn display_name(&self) -> &str {
        self.base().display_name()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn config(&self) -> ConfigMap {
        self.base().config()
    }

    /// Persist a new config without validating it
    fn set_config(&self, config: ConfigMap) -> bool {
        self.base().set_config(config)
    }

    fn set_enabled(&self, enabled: bool) -> bool {
        self.base().set_enabled(enabled)
    }

    fn reload(&self) -> bool {
        self.base().reload()
    }

    /// Take a payment
    async fn process_payment(&self, request: &PaymentRequest) -> PaymentOutcome;

    /// Interpret a provider webhook payload.
    ///
    /// Unrecognized event types yield `success: false`.
    fn verify_payment(&self, webhook: &Value) -> WebhookVerification;

    /// Refund `amount`, or the full payment when `None`
    async fn refund_payment(&self, transaction_id: &str, amount: Option<Decimal>)
        -> RefundOutcome;

    async fn payment_status(&self, transaction_id: &str) -> PaymentStatusReport;

    fn validate_config(&self) -> ConfigValidation;

    /// Admin form schema
    fn config_fields(&self) -> Vec<ConfigField>;

    /// Check a webhook's signature against the raw request body
    async fn verify_webhook_signature(&self, _payload: &[u8], _headers: &WebhookHeaders) -> bool {
        false
    }

    /// Order id carried by a webhook event, if any
    fn webhook_order_id(&self, _event: &Value) -> Option<String> {
        None
    }

    /// Default: `/webhook/{name}`
    fn webhook_path(&self) -> String {
        format!("/webhook/{}", self.name())
    }
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Registry of gateways, keyed by name.
///
/// Iteration follows registration order. Registering a name twice replaces
/// the earlier instance in place.
#[derive(Clone, Default)]
pub struct GatewayManager {
    gateways: Vec<BoxedPaymentGateway>,
}

impl GatewayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gateway
    pub fn register(&mut self, gateway: BoxedPaymentGateway) {
        match self
            .gateways
            .iter_mut()
            .find(|existing| existing.name() == gateway.name())
        {
            Some(slot) => *slot = gateway,
            None => self.gateways.push(gateway),
        }
    }

    /// Register with builder pattern
    pub fn with_gateway(mut self, gateway: BoxedPaymentGateway) -> Self {
        self.register(gateway);
        self
    }

    pub fn gateways(&self) -> &[BoxedPaymentGateway] {
        &self.gateways
    }

    pub fn enabled_gateways(&self) -> Vec<&BoxedPaymentGateway> {
        self.gateways.iter().filter(|g| g.is_enabled()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&BoxedPaymentGateway> {
        self.gateways.iter().find(|g| g.name() == name)
    }

    fn require(&self, name: &str) -> PaymentResult<&BoxedPaymentGateway> {
        self.get(name).ok_or_else(|| PaymentError::GatewayNotFound {
            name: name.to_string(),
        })
    }

    fn require_enabled(&self, name: &str) -> PaymentResult<&BoxedPaymentGateway> {
        let gateway = self.require(name)?;
        if !gateway.is_enabled() {
            return Err(PaymentError::GatewayDisabled {
                name: name.to_string(),
            });
        }
        Ok(gateway)
    }

    pub async fn process_payment(&self, name: &str, request: &PaymentRequest) -> PaymentOutcome {
        match self.require_enabled(name) {
            Ok(gateway) => gateway.process_payment(request).await,
            Err(e) => e.into(),
        }
    }

    pub async fn refund_payment(
        &self,
        name: &str,
        transaction_id: &str,
        amount: Option<Decimal>,
    ) -> RefundOutcome {
        match self.require_enabled(name) {
            Ok(gateway) => gateway.refund_payment(transaction_id, amount).await,
            Err(e) => e.into(),
        }
    }

    pub async fn payment_status(&self, name: &str, transaction_id: &str) -> PaymentStatusReport {
        match self.require(name) {
            Ok(gateway) => gateway.payment_status(transaction_id).await,
            Err(e) => e.into(),
        }
    }

    pub fn verify_payment(&self, name: &str, webhook: &Value) -> WebhookVerification {
        match self.require(name) {
            Ok(gateway) => gateway.verify_payment(webhook),
            Err(e) => e.into(),
        }
    }

    /// False for unknown gateways
    pub async fn verify_webhook_signature(
        &self,
        name: &str,
        payload: &[u8],
        headers: &WebhookHeaders,
    ) -> bool {
        match self.get(name) {
            Some(gateway) => gateway.verify_webhook_signature(payload, headers).await,
            None => false,
        }
    }

    pub fn webhook_order_id(&self, name: &str, event: &Value) -> Option<String> {
        self.get(name)?.webhook_order_id(event)
    }

    /// Form schema, empty for unknown gateways
    pub fn config_fields(&self, name: &str) -> Vec<ConfigField> {
        self.get(name)
            .map(|g| g.config_fields())
            .unwrap_or_default()
    }

    pub fn validate_config(&self, name: &str) -> ConfigValidation {
        match self.get(name) {
            Some(gateway) => gateway.validate_config(),
            None => ConfigValidation::not_found(format!("Gateway not found: {}", name)),
        }
    }

    /// Persist a gateway's config. `Ok(false)` means the store write failed.
    pub fn set_gateway_config(&self, name: &str, config: ConfigMap) -> PaymentResult<bool> {
        Ok(self.require(name)?.set_config(config))
    }

    pub fn set_gateway_enabled(&self, name: &str, enabled: bool) -> PaymentResult<bool> {
        Ok(self.require(name)?.set_enabled(enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_map;
    use crate::http::{HttpRequest, RawResponse};
    use crate::store::MemoryConfigStore;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OfflineTransport;

    #[async_trait]
    impl HttpTransport for OfflineTransport {
        async fn send(&self, _request: HttpRequest) -> PaymentResult<RawResponse> {
            Err(PaymentError::NetworkError("offline".into()))
        }
    }

    /// Counts delegated calls so the manager guards can be observed
    struct CountingGateway {
        base: GatewayBase,
        calls: AtomicUsize,
    }

    impl CountingGateway {
        fn new(name: &str, store: Arc<dyn ConfigStore>) -> Self {
            Self {
                base: GatewayBase::new(name, name.to_uppercase(), store, Arc::new(OfflineTransport)),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for CountingGateway {
        fn base(&self) -> &GatewayBase {
            &self.base
        }

        async fn process_payment(&self, _request: &PaymentRequest) -> PaymentOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PaymentOutcome::completed("txn_1", "ok")
        }

        fn verify_payment(&self, _webhook: &Value) -> WebhookVerification {
            WebhookVerification::rejected("Invalid webhook data")
        }

        async fn refund_payment(
            &self,
            _transaction_id: &str,
            _amount: Option<Decimal>,
        ) -> RefundOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            RefundOutcome::refunded("re_1", "ok")
        }

        async fn payment_status(&self, _transaction_id: &str) -> PaymentStatusReport {
            PaymentStatusReport::found("succeeded", dec!(1), Default::default())
        }

        fn validate_config(&self) -> ConfigValidation {
            ConfigValidation::from_errors(self.base.required_field_errors(&["api_key"]))
        }

        fn config_fields(&self) -> Vec<ConfigField> {
            vec![ConfigField::new("api_key", crate::config::FieldType::Password, "API Key").required()]
        }
    }

    /// Serves loads from memory but refuses every write
    struct ReadOnlyStore(MemoryConfigStore);

    impl ConfigStore for ReadOnlyStore {
        fn load_gateway(&self, name: &str) -> PaymentResult<Option<GatewayRecord>> {
            self.0.load_gateway(name)
        }

        fn save_gateway(&self, _record: &GatewayRecord) -> PaymentResult<()> {
            Err(PaymentError::Store("disk full".into()))
        }

        fn load_shipping_method(
            &self,
            name: &str,
        ) -> PaymentResult<Option<crate::config::ShippingMethodRecord>> {
            self.0.load_shipping_method(name)
        }

        fn save_shipping_method(
            &self,
            _record: &crate::config::ShippingMethodRecord,
        ) -> PaymentResult<()> {
            Err(PaymentError::Store("disk full".into()))
        }
    }

    fn store_with(enabled: &[&str]) -> Arc<dyn ConfigStore> {
        let mut store = MemoryConfigStore::new();
        for name in enabled {
            store = store.with_gateway(GatewayRecord::new(*name, true, ConfigMap::new()));
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_unknown_gateway_is_reported() {
        let manager = GatewayManager::new();
        let outcome = manager
            .process_payment("nonexistent", &PaymentRequest::new(dec!(10), "USD"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Payment gateway not found: nonexistent");

        let validation = manager.validate_config("nonexistent");
        assert!(!validation.valid);
        assert_eq!(validation.messages(), vec!["Gateway not found: nonexistent"]);
        assert!(manager.config_fields("nonexistent").is_empty());
    }

    #[tokio::test]
    async fn test_disabled_gateway_is_never_invoked() {
        let store = store_with(&[]);
        let gateway = Arc::new(CountingGateway::new("mock", store));
        let manager = GatewayManager::new().with_gateway(gateway.clone());

        let outcome = manager
            .process_payment("mock", &PaymentRequest::new(dec!(10), "USD"))
            .await;
        let refund = manager.refund_payment("mock", "txn_1", None).await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "Payment gateway is not enabled: mock");
        assert!(!refund.success);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

        // status lookups only require the gateway to exist
        assert!(manager.payment_status("mock", "txn_1").await.success);
    }

    #[tokio::test]
    async fn test_enabled_gateway_delegates() {
        let store = store_with(&["mock"]);
        let gateway = Arc::new(CountingGateway::new("mock", store));
        let manager = GatewayManager::new().with_gateway(gateway.clone());

        let outcome = manager
            .process_payment("mock", &PaymentRequest::new(dec!(10), "USD"))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.transaction_id.as_deref(), Some("txn_1"));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_replaces_in_place() {
        let store = store_with(&["a", "b"]);
        let manager = GatewayManager::new()
            .with_gateway(Arc::new(CountingGateway::new("a", store.clone())))
            .with_gateway(Arc::new(CountingGateway::new("b", store.clone())))
            .with_gateway(Arc::new(CountingGateway::new("a", store)));

        let names: Vec<_> = manager.gateways().iter().map(|g| g.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_config_changes_are_persisted() {
        let store = Arc::new(MemoryConfigStore::new());
        let gateway = Arc::new(CountingGateway::new("mock", store.clone()));
        let manager = GatewayManager::new().with_gateway(gateway.clone());

        assert!(!manager.validate_config("mock").valid);
        assert!(manager
            .set_gateway_config("mock", config_map([("api_key", "secret")]))
            .unwrap());
        assert!(manager.set_gateway_enabled("mock", true).unwrap());

        assert!(manager.validate_config("mock").valid);
        assert_eq!(manager.enabled_gateways().len(), 1);

        let saved = store.document();
        assert!(saved.gateways["mock"].enabled);
        assert_eq!(saved.gateways["mock"].config["api_key"], "secret");

        assert!(matches!(
            manager.set_gateway_enabled("missing", true),
            Err(PaymentError::GatewayNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_record() {
        let store = Arc::new(ReadOnlyStore(MemoryConfigStore::new().with_gateway(
            GatewayRecord::new("mock", false, config_map([("api_key", "old")])),
        )));
        let gateway = Arc::new(CountingGateway::new("mock", store));
        let manager = GatewayManager::new().with_gateway(gateway.clone());

        assert!(!gateway.set_config(config_map([("api_key", "new")])));
        assert_eq!(gateway.config()["api_key"], "old");

        assert_eq!(manager.set_gateway_enabled("mock", true).ok(), Some(false));
        assert!(!gateway.is_enabled());

        let outcome = manager
            .process_payment("mock", &PaymentRequest::new(dec!(10), "USD"))
            .await;
        assert!(!outcome.success);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reload_picks_up_external_changes() {
        let store = Arc::new(MemoryConfigStore::new());
        let gateway = CountingGateway::new("mock", store.clone());
        assert!(!gateway.is_enabled());

        store
            .save_gateway(&GatewayRecord::new("mock", true, ConfigMap::new()))
            .unwrap();
        assert!(!gateway.is_enabled());

        assert!(gateway.reload());
        assert!(gateway.is_enabled());
        assert_eq!(gateway.webhook_path(), "/webhook/mock");
        assert!(gateway.webhook_order_id(&json!({})).is_none());
    }
}
