//! # Application State
//!
//! Shared state for the Axum application: the gateway and shipping
//! registries plus process configuration.

use commerce_core::{
    ConfigStore, FileConfigStore, GatewayManager, HttpTransport, ReqwestTransport,
    ShippingManager,
};
use commerce_paypal::PayPalGateway;
use commerce_shipping::{FlatRateShipping, WeightBasedShipping};
use commerce_stripe::StripeGateway;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// TOML document holding gateway and shipping records
    pub config_path: PathBuf,
    /// Turns on strategy activity logging
    pub debug: bool,
    pub log_format: LogFormat,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            config_path: std::env::var("COMMERCE_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/commerce.toml")),
            debug: std::env::var("COMMERCE_DEBUG")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            log_format: std::env::var("LOG_FORMAT")
                .map(|v| LogFormat::from_env_value(&v))
                .unwrap_or_default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    ///
    /// Strategy activity targets stay off unless debug is on.
    pub fn default_log_directives(&self) -> String {
        let activity = if self.debug { "debug" } else { "off" };
        format!(
            "info,{}={},{}={}",
            commerce_core::activity::GATEWAY_TARGET,
            activity,
            commerce_core::activity::SHIPPING_TARGET,
            activity
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            config_path: PathBuf::from("config/commerce.toml"),
            debug: false,
            log_format: LogFormat::Pretty,
            environment: "development".to_string(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub gateways: Arc<GatewayManager>,
    pub shipping: Arc<ShippingManager>,
    pub config: AppConfig,
}

impl AppState {
    /// Build the default registries over the TOML config store
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn ConfigStore> = Arc::new(FileConfigStore::new(&config.config_path));
        let transport: Arc<dyn HttpTransport> = Arc::new(
            ReqwestTransport::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize HTTP client: {}", e))?,
        );

        Ok(Self::with_managers(
            default_gateway_manager(store.clone(), transport),
            default_shipping_manager(store),
            config,
        ))
    }

    /// State around caller-built registries
    pub fn with_managers(
        gateways: GatewayManager,
        shipping: ShippingManager,
        config: AppConfig,
    ) -> Self {
        Self {
            gateways: Arc::new(gateways),
            shipping: Arc::new(shipping),
            config,
        }
    }
}

/// Stripe and PayPal, in that order
pub fn default_gateway_manager(
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn HttpTransport>,
) -> GatewayManager {
    GatewayManager::new()
        .with_gateway(Arc::new(StripeGateway::new(store.clone(), transport.clone())))
        .with_gateway(Arc::new(PayPalGateway::new(store, transport)))
}

/// Flat rate and weight-based, in that order
pub fn default_shipping_manager(store: Arc<dyn ConfigStore>) -> ShippingManager {
    ShippingManager::new()
        .with_method(Arc::new(FlatRateShipping::new(store.clone())))
        .with_method(Arc::new(WeightBasedShipping::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use commerce_core::MemoryConfigStore;

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..AppConfig::default()
        };

        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");

        let bad = AppConfig {
            host: "not a host".to_string(),
            ..AppConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_log_directives_follow_debug_flag() {
        let quiet = AppConfig::default();
        assert_eq!(
            quiet.default_log_directives(),
            "info,commerce_gateway=off,commerce_shipping=off"
        );

        let debug = AppConfig {
            debug: true,
            ..AppConfig::default()
        };
        assert_eq!(
            debug.default_log_directives(),
            "info,commerce_gateway=debug,commerce_shipping=debug"
        );
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_env_value("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(""), LogFormat::Pretty);
    }

    #[test]
    fn test_default_registries() {
        let store: Arc<dyn ConfigStore> = Arc::new(MemoryConfigStore::new());
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new().unwrap());

        let gateways = default_gateway_manager(store.clone(), transport);
        let names: Vec<_> = gateways.gateways().iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["stripe", "paypal"]);
        assert!(gateways.enabled_gateways().is_empty());

        let shipping = default_shipping_manager(store);
        let names: Vec<_> = shipping.methods().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["flat_rate", "weight_based"]);
    }
}
