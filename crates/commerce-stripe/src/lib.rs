//! # commerce-stripe
//!
//! Stripe payment gateway for FearlessCommerce.
//!
//! ## Flow
//!
//! 1. `process_payment` creates and confirms a payment intent
//! 2. `succeeded` completes immediately; `requires_action` hands the client
//!    secret back for browser-side authentication
//! 3. Stripe posts `payment_intent.succeeded` to `/webhook/stripe`, signed
//!    with the endpoint secret
//!
//! ## Configuration
//!
//! | Field | |
//! |---|---|
//! | `secret_key` | `sk_test_...` / `sk_live_...` |
//! | `publishable_key` | `pk_test_...` / `pk_live_...` |
//! | `webhook_secret` | `whsec_...` (optional) |

pub mod config;
pub mod gateway;
pub mod webhook;

pub use config::{StripeSettings, DEFAULT_API_BASE_URL};
pub use gateway::{StripeGateway, STRIPE};
pub use webhook::{compute_signature, parse_signature_header, verify_signature, SIGNATURE_HEADER};
