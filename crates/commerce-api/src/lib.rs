//! # commerce-api
//!
//! HTTP API layer for FearlessCommerce.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Payment, refund and status endpoints over the gateway registry
//! - Shipping quote endpoints over the shipping registry
//! - Webhook handlers for every registered gateway
//! - Admin endpoints for strategy settings
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/gateways` | Enabled gateways |
//! | POST | `/api/v1/payments/{gateway}` | Take a payment |
//! | POST | `/api/v1/payments/{gateway}/refunds` | Refund |
//! | GET | `/api/v1/payments/{gateway}/{transaction_id}` | Payment status |
//! | GET | `/api/v1/shipping/methods` | Enabled shipping methods |
//! | POST | `/api/v1/shipping/options` | All quotes, cheapest first |
//! | POST | `/api/v1/shipping/{method}` | One method's quote |
//! | GET/PUT | `/api/v1/admin/...` | Settings screens |
//! | POST | `/webhook/{gateway}` | Provider webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, LogFormat};
