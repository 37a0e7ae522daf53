//! # commerce-core
//!
//! Shared types and contracts for the FearlessCommerce payment and shipping
//! layer.
//!
//! This crate provides:
//! - `PaymentGateway` trait, `GatewayBase` and the `GatewayManager` registry
//! - `ShippingMethod` trait, `ShippingBase` and the `ShippingManager` registry
//! - `Currency` and minor-unit conversion
//! - `CartItem` and `Address`
//! - Strategy records, typed config validation and admin form schemas
//! - `ConfigStore` with in-memory and TOML file implementations
//! - The provider HTTP helper
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use commerce_core::{GatewayManager, PaymentRequest};
//! use rust_decimal_macros::dec;
//!
//! let manager = GatewayManager::new().with_gateway(stripe);
//!
//! let outcome = manager
//!     .process_payment("stripe", &PaymentRequest::new(dec!(49.99), "USD"))
//!     .await;
//!
//! if outcome.requires_action {
//!     // hand outcome.client_secret to the browser
//! }
//! ```

pub mod activity;
pub mod cart;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod money;
pub mod payment;
pub mod shipping;
pub mod store;

// Re-exports for convenience
pub use activity::LogLevel;
pub use cart::{total_value, total_weight, Address, CartItem, DEFAULT_ITEM_WEIGHT_KG};
pub use config::{
    config_map, ConfigError, ConfigErrorKind, ConfigField, ConfigMap, ConfigReader,
    ConfigValidation, FieldOption, FieldType, GatewayRecord, ShippingMethodRecord,
};
pub use error::{PaymentError, PaymentResult};
pub use gateway::{BoxedPaymentGateway, GatewayBase, GatewayManager, PaymentGateway};
pub use http::{
    make_http_request, HttpMethod, HttpOutcome, HttpRequest, HttpTransport, RawResponse,
    ReqwestTransport, RequestBody,
};
pub use money::{two_decimal_string, Currency, ZERO_DECIMAL_CURRENCIES};
pub use payment::{
    PaymentOutcome, PaymentRequest, PaymentStatusReport, RefundOutcome, WebhookHeaders,
    WebhookVerification,
};
pub use shipping::{
    BoxedShippingMethod, ShippingBase, ShippingCalculation, ShippingManager, ShippingMethod,
    ShippingMethodStatus, ShippingQuote,
};
pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};
