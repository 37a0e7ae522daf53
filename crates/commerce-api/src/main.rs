//! # FearlessCommerce
//!
//! Payment gateway and shipping service.
//!
//! ## Usage
//!
//! ```bash
//! # Gateway and shipping records
//! export COMMERCE_CONFIG_PATH=config/commerce.toml
//!
//! # Strategy activity logs
//! export COMMERCE_DEBUG=true
//!
//! # Run the server
//! fearless-commerce
//! ```

use commerce_api::{routes, AppConfig, AppState, LogFormat};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(&config);

    let addr = config.socket_addr()?;
    let is_prod = config.is_production();

    info!("Environment: {}", config.environment);
    info!("Config store: {}", config.config_path.display());

    let state = AppState::new(config)?;

    info!(
        "Payment gateways: {:?}",
        state
            .gateways
            .gateways()
            .iter()
            .map(|g| g.name())
            .collect::<Vec<_>>()
    );
    info!(
        "Shipping methods: {:?}",
        state
            .shipping
            .methods()
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
    );

    let app = routes::create_router(state);

    info!("FearlessCommerce starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Payments: POST http://{}/api/v1/payments/{{gateway}}", addr);
        info!("Webhooks: POST http://{}/webhook/{{gateway}}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` wins; otherwise strategy activity follows `COMMERCE_DEBUG`
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_directives()));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}
