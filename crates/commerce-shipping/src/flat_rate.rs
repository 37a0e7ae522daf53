//! # Flat Rate Shipping
//!
//! One fixed cost per order, waived when the cart value reaches the
//! free-shipping threshold.

use crate::delivery::{self, base_delivery_days};
use commerce_core::{
    total_value, Address, CartItem, ConfigError, ConfigField, ConfigMap, ConfigReader,
    ConfigStore, ConfigValidation, FieldType, LogLevel, PaymentError, PaymentResult,
    ShippingBase, ShippingCalculation, ShippingMethod,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

pub const FLAT_RATE: &str = "flat_rate";

/// Typed view of the flat-rate config map
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRateSettings {
    pub cost: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub default_delivery_days: Option<i64>,
    pub allowed_countries: Vec<String>,
}

impl FlatRateSettings {
    /// Parse and validate. Errors are returned in field order: missing
    /// fields, then unparseable numbers, then range violations.
    pub fn from_config(config: &ConfigMap) -> Result<Self, Vec<ConfigError>> {
        let mut errors = commerce_core::config::required_field_errors(config, &["cost"]);

        let mut reader = ConfigReader::new(config);
        let cost = reader.decimal("cost");
        let free_shipping_threshold = reader.decimal("free_shipping_threshold");
        let default_delivery_days = reader.days("default_delivery_days");
        let allowed_countries = reader.list("allowed_countries");
        errors.extend(reader.finish());

        if cost.is_some_and(|c| c < Decimal::ZERO) {
            errors.push(ConfigError::invalid("cost", "Cost must be a positive number"));
        }
        if free_shipping_threshold.is_some_and(|t| t < Decimal::ZERO) {
            errors.push(ConfigError::invalid(
                "free_shipping_threshold",
                "Free shipping threshold must be a positive number",
            ));
        }
        if default_delivery_days.is_some_and(|d| d < 1) {
            errors.push(ConfigError::invalid(
                "default_delivery_days",
                "Default delivery days must be at least 1",
            ));
        }

        match cost {
            Some(cost) if errors.is_empty() => Ok(Self {
                cost,
                free_shipping_threshold,
                default_delivery_days,
                allowed_countries,
            }),
            _ => Err(errors),
        }
    }

    /// Cost for a cart of the given value
    pub fn cost_for(&self, cart_value: Decimal) -> Decimal {
        match self.free_shipping_threshold {
            Some(threshold) if cart_value >= threshold => Decimal::ZERO,
            _ => self.cost,
        }
    }
}

/// Flat rate shipping method
pub struct FlatRateShipping {
    base: ShippingBase,
}

impl FlatRateShipping {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            base: ShippingBase::new(FLAT_RATE, "Flat Rate Shipping", store),
        }
    }

    fn configured_default_days(&self) -> Option<u32> {
        let config = self.config();
        let mut reader = ConfigReader::new(&config);
        reader
            .days("default_delivery_days")
            .filter(|days| *days >= 1)
            .and_then(|days| u32::try_from(days).ok())
    }

    fn quote(&self, items: &[CartItem], address: &Address) -> PaymentResult<ShippingCalculation> {
        let settings = FlatRateSettings::from_config(&self.config())
            .map_err(PaymentError::InvalidConfiguration)?;

        let cart_value = total_value(items);
        let cost = settings.cost_for(cart_value);
        if cost.is_zero() && !settings.cost.is_zero() {
            self.base.log(
                LogLevel::Info,
                "Free shipping applied",
                &json!({
                    "total_value": cart_value,
                    "threshold": settings.free_shipping_threshold,
                }),
            );
        }

        Ok(ShippingCalculation::quoted(
            cost,
            self.estimated_delivery_days(address, Decimal::ZERO),
            "Flat rate shipping calculated successfully",
        ))
    }
}

impl ShippingMethod for FlatRateShipping {
    fn base(&self) -> &ShippingBase {
        &self.base
    }

    fn calculate_shipping(&self, items: &[CartItem], address: &Address) -> ShippingCalculation {
        self.base.log(
            LogLevel::Info,
            "Calculating flat rate shipping",
            &json!({"items_count": items.len(), "address": address}),
        );

        if !self.is_enabled() {
            return ShippingCalculation::unavailable("Flat rate shipping is not enabled");
        }

        if !self.is_available_for_address(address) {
            return ShippingCalculation::unavailable(
                "Flat rate shipping is not available for this address",
            );
        }

        self.quote(items, address).unwrap_or_else(Into::into)
    }

    fn is_available_for_address(&self, address: &Address) -> bool {
        let config = self.config();
        let allowed = ConfigReader::new(&config).list("allowed_countries");
        self.base.is_address_allowed(address, &allowed)
    }

    /// Weight does not affect flat-rate delivery
    fn estimated_delivery_days(&self, address: &Address, _total_weight: Decimal) -> u32 {
        base_delivery_days(&address.country_code(), self.configured_default_days())
    }

    fn validate_config(&self) -> ConfigValidation {
        ConfigValidation::from_errors(
            FlatRateSettings::from_config(&self.config())
                .err()
                .unwrap_or_default(),
        )
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("cost", FieldType::Number, "Shipping Cost")
                .required()
                .step("0.01")
                .min("0")
                .describe("Fixed shipping cost in your store currency"),
            ConfigField::new(
                "free_shipping_threshold",
                FieldType::Number,
                "Free Shipping Threshold",
            )
            .step("0.01")
            .min("0")
            .describe("Order value threshold for free shipping (leave empty to disable)"),
            delivery::default_delivery_days_field(),
            delivery::allowed_countries_field(),
        ]
    }
}
