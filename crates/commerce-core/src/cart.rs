//! # Cart Types
//!
//! Caller-supplied cart items and shipping addresses. Owned by the order flow;
//! nothing here is persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weight assumed for an item that does not declare one (kg per unit)
pub const DEFAULT_ITEM_WEIGHT_KG: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// A line in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
    /// Unit price at the time the item was added
    pub price_at_purchase: Decimal,
    /// Unit weight in kg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Decimal>,
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, quantity: u32, price_at_purchase: Decimal) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            price_at_purchase,
            weight: None,
        }
    }

    /// Builder: set unit weight (kg)
    pub fn with_weight(mut self, weight: Decimal) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn line_value(&self) -> Decimal {
        self.price_at_purchase * Decimal::from(self.quantity)
    }

    pub fn line_weight(&self) -> Decimal {
        self.weight.unwrap_or(DEFAULT_ITEM_WEIGHT_KG) * Decimal::from(self.quantity)
    }
}

/// Sum of `price_at_purchase * quantity`
pub fn total_value(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_value).sum()
}

/// Sum of unit weight times quantity, in kg
pub fn total_weight(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_weight).sum()
}

/// Shipping destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    /// ISO 3166 alpha-2
    #[serde(default)]
    pub country: String,
}

impl Address {
    /// Country, state, city and postal code all present
    pub fn is_valid(&self) -> bool {
        [&self.country, &self.state, &self.city, &self.postal_code]
            .iter()
            .all(|part| !part.trim().is_empty())
    }

    /// Upper-cased country code
    pub fn country_code(&self) -> String {
        self.country.trim().to_uppercase()
    }
}
