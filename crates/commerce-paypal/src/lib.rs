//! # commerce-paypal
//!
//! PayPal payment gateway for FearlessCommerce.
//!
//! ## Flow
//!
//! 1. `process_payment` creates an order (`intent: CAPTURE`)
//! 2. Without a payment method the buyer is sent to the order's `approve`
//!    link; with one the order is captured immediately
//! 3. PayPal posts `PAYMENT.CAPTURE.COMPLETED` to `/webhook/paypal`; the
//!    signature is checked by PayPal's verification endpoint
//!
//! ## Configuration
//!
//! | Field | |
//! |---|---|
//! | `client_id` | REST app client id |
//! | `client_secret` | REST app secret |
//! | `mode` | `sandbox` or `live` |
//! | `webhook_id` | webhook id (optional, required for signature checks) |

pub mod config;
pub mod gateway;
pub mod token;
pub mod webhook;

pub use config::{PayPalMode, PayPalSettings, LIVE_API_BASE_URL, SANDBOX_API_BASE_URL};
pub use gateway::{PayPalGateway, PAYPAL};
pub use token::{AccessToken, TokenCache};
