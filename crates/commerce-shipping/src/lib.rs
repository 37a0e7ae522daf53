//! # commerce-shipping
//!
//! Built-in shipping methods for FearlessCommerce.
//!
//! - [`FlatRateShipping`] (`flat_rate`): fixed cost with an optional
//!   free-shipping threshold
//! - [`WeightBasedShipping`] (`weight_based`): base cost plus a per-kg rate,
//!   clamped and capped by weight
//!
//! Both estimate delivery time from the destination country.

pub mod delivery;
pub mod flat_rate;
pub mod weight_based;

pub use delivery::{base_delivery_days, COUNTRY_OPTIONS, FALLBACK_DELIVERY_DAYS};
pub use flat_rate::{FlatRateSettings, FlatRateShipping, FLAT_RATE};
pub use weight_based::{WeightBasedSettings, WeightBasedShipping, WEIGHT_BASED};
