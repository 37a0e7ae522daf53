//! # Weight-Based Shipping
//!
//! `cost = base_cost + total_weight * cost_per_kg`, clamped into
//! `[min_cost, max_cost]` when those bounds are set. Carts heavier than
//! `max_weight` are refused.
//!
//! Heavier parcels also take longer: `weight_delivery_multiplier` adds
//! `ceil(total_weight * multiplier)` days to the country estimate.

use crate::delivery::{self, base_delivery_days};
use commerce_core::{
    total_weight, Address, CartItem, ConfigError, ConfigField, ConfigMap, ConfigReader,
    ConfigStore, ConfigValidation, FieldType, LogLevel, PaymentError, PaymentResult,
    ShippingBase, ShippingCalculation, ShippingMethod,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

pub const WEIGHT_BASED: &str = "weight_based";

/// Typed view of the weight-based config map
#[derive(Debug, Clone, PartialEq)]
pub struct WeightBasedSettings {
    pub base_cost: Decimal,
    pub cost_per_kg: Decimal,
    pub max_weight: Option<Decimal>,
    pub min_cost: Option<Decimal>,
    pub max_cost: Option<Decimal>,
    pub default_delivery_days: Option<i64>,
    pub weight_delivery_multiplier: Option<Decimal>,
    pub allowed_countries: Vec<String>,
}

impl WeightBasedSettings {
    pub fn from_config(config: &ConfigMap) -> Result<Self, Vec<ConfigError>> {
        let mut errors =
            commerce_core::config::required_field_errors(config, &["base_cost", "cost_per_kg"]);

        let mut reader = ConfigReader::new(config);
        let base_cost = reader.decimal("base_cost");
        let cost_per_kg = reader.decimal("cost_per_kg");
        let max_weight = reader.decimal("max_weight");
        let min_cost = reader.decimal("min_cost");
        let max_cost = reader.decimal("max_cost");
        let default_delivery_days = reader.days("default_delivery_days");
        let weight_delivery_multiplier = reader.decimal("weight_delivery_multiplier");
        let allowed_countries = reader.list("allowed_countries");
        errors.extend(reader.finish());

        let negative = |value: Option<Decimal>| value.is_some_and(|v| v < Decimal::ZERO);

        if negative(base_cost) {
            errors.push(ConfigError::invalid("base_cost", "Base cost must be a positive number"));
        }
        if negative(cost_per_kg) {
            errors.push(ConfigError::invalid(
                "cost_per_kg",
                "Cost per kg must be a positive number",
            ));
        }
        if max_weight.is_some_and(|w| w <= Decimal::ZERO) {
            errors.push(ConfigError::invalid(
                "max_weight",
                "Maximum weight must be a positive number",
            ));
        }
        if negative(min_cost) {
            errors.push(ConfigError::invalid("min_cost", "Minimum cost must be a positive number"));
        }
        if negative(max_cost) {
            errors.push(ConfigError::invalid("max_cost", "Maximum cost must be a positive number"));
        }
        if let (Some(min), Some(max)) = (min_cost, max_cost) {
            if min > max {
                errors.push(ConfigError::invalid(
                    "min_cost",
                    "Minimum cost cannot be greater than maximum cost",
                ));
            }
        }
        if default_delivery_days.is_some_and(|d| d < 1) {
            errors.push(ConfigError::invalid(
                "default_delivery_days",
                "Default delivery days must be at least 1",
            ));
        }
        if negative(weight_delivery_multiplier) {
            errors.push(ConfigError::invalid(
                "weight_delivery_multiplier",
                "Weight delivery multiplier must be a positive number",
            ));
        }

        match (base_cost, cost_per_kg) {
            (Some(base_cost), Some(cost_per_kg)) if errors.is_empty() => Ok(Self {
                base_cost,
                cost_per_kg,
                max_weight,
                min_cost,
                max_cost,
                default_delivery_days,
                weight_delivery_multiplier,
                allowed_countries,
            }),
            _ => Err(errors),
        }
    }

    /// Clamped cost for a parcel; `None` when it exceeds `max_weight`
    pub fn cost_for(&self, weight: Decimal) -> Option<Decimal> {
        if self.max_weight.is_some_and(|max| weight > max) {
            return None;
        }

        let mut cost = self.base_cost + weight * self.cost_per_kg;
        if let Some(min) = self.min_cost {
            cost = cost.max(min);
        }
        if let Some(max) = self.max_cost {
            cost = cost.min(max);
        }
        Some(cost)
    }
}

/// Extra days for a parcel of `weight` kg
fn weight_delay_days(weight: Decimal, multiplier: Option<Decimal>) -> u32 {
    match multiplier {
        Some(multiplier) if multiplier > Decimal::ZERO && weight > Decimal::ZERO => {
            (weight * multiplier).ceil().to_u32().unwrap_or(u32::MAX)
        }
        _ => 0,
    }
}

/// Weight-based shipping method
pub struct WeightBasedShipping {
    base: ShippingBase,
}

impl WeightBasedShipping {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            base: ShippingBase::new(WEIGHT_BASED, "Weight-Based Shipping", store),
        }
    }

    fn quote(&self, items: &[CartItem], address: &Address) -> PaymentResult<ShippingCalculation> {
        let settings = WeightBasedSettings::from_config(&self.config())
            .map_err(PaymentError::InvalidConfiguration)?;

        let weight = total_weight(items);
        let cost = settings.cost_for(weight).ok_or_else(|| {
            PaymentError::LimitExceeded("Order weight exceeds maximum allowed weight".to_string())
        })?;

        self.base.log(
            LogLevel::Info,
            "Weight-based shipping calculated",
            &json!({
                "total_weight": weight,
                "base_cost": settings.base_cost,
                "cost_per_kg": settings.cost_per_kg,
                "final_cost": cost,
            }),
        );

        Ok(ShippingCalculation::quoted(
            cost,
            self.estimated_delivery_days(address, weight),
            "Weight-based shipping calculated successfully",
        ))
    }
}

impl ShippingMethod for WeightBasedShipping {
    fn base(&self) -> &ShippingBase {
        &self.base
    }

    fn calculate_shipping(&self, items: &[CartItem], address: &Address) -> ShippingCalculation {
        self.base.log(
            LogLevel::Info,
            "Calculating weight-based shipping",
            &json!({"items_count": items.len(), "address": address}),
        );

        if !self.is_enabled() {
            return ShippingCalculation::unavailable("Weight-based shipping is not enabled");
        }

        if !self.is_available_for_address(address) {
            return ShippingCalculation::unavailable(
                "Weight-based shipping is not available for this address",
            );
        }

        self.quote(items, address).unwrap_or_else(Into::into)
    }

    fn is_available_for_address(&self, address: &Address) -> bool {
        let config = self.config();
        let allowed = ConfigReader::new(&config).list("allowed_countries");
        self.base.is_address_allowed(address, &allowed)
    }

    fn estimated_delivery_days(&self, address: &Address, total_weight: Decimal) -> u32 {
        let config = self.config();
        let mut reader = ConfigReader::new(&config);
        let configured_default = reader
            .days("default_delivery_days")
            .filter(|days| *days >= 1)
            .and_then(|days| u32::try_from(days).ok());
        let multiplier = reader.decimal("weight_delivery_multiplier");

        base_delivery_days(&address.country_code(), configured_default)
            .saturating_add(weight_delay_days(total_weight, multiplier))
    }

    fn validate_config(&self) -> ConfigValidation {
        ConfigValidation::from_errors(
            WeightBasedSettings::from_config(&self.config())
                .err()
                .unwrap_or_default(),
        )
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("base_cost", FieldType::Number, "Base Cost")
                .required()
                .step("0.01")
                .min("0")
                .describe("Base shipping cost regardless of weight"),
            ConfigField::new("cost_per_kg", FieldType::Number, "Cost per Kilogram")
                .required()
                .step("0.01")
                .min("0")
                .describe("Additional cost per kilogram of weight"),
            ConfigField::new("max_weight", FieldType::Number, "Maximum Weight (kg)")
                .step("0.1")
                .min("0")
                .describe(
                    "Maximum weight allowed for this shipping method (leave empty for no limit)",
                ),
            ConfigField::new("min_cost", FieldType::Number, "Minimum Cost")
                .step("0.01")
                .min("0")
                .describe("Minimum shipping cost (leave empty for no minimum)"),
            ConfigField::new("max_cost", FieldType::Number, "Maximum Cost")
                .step("0.01")
                .min("0")
                .describe("Maximum shipping cost (leave empty for no maximum)"),
            delivery::default_delivery_days_field(),
            ConfigField::new(
                "weight_delivery_multiplier",
                FieldType::Number,
                "Weight Delivery Multiplier",
            )
            .step("0.1")
            .min("0")
            .describe("Additional days per kg of weight (leave empty to disable)"),
            delivery::allowed_countries_field(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commerce_core::{config_map, MemoryConfigStore, ShippingMethodRecord};
    use rust_decimal_macros::dec;

    fn shipping(config: ConfigMap) -> WeightBasedShipping {
        let store = MemoryConfigStore::new().with_shipping_method(ShippingMethodRecord::new(
            WEIGHT_BASED,
            "Weight-Based Shipping",
            true,
            config,
        ));
        WeightBasedShipping::new(Arc::new(store))
    }

    fn address(country: &str) -> Address {
        Address {
            name: "Linus".into(),
            address: "Mannerheimintie 1".into(),
            city: "Helsinki".into(),
            state: "Uusimaa".into(),
            postal_code: "00100".into(),
            country: country.into(),
        }
    }

    fn parcel(kg: Decimal) -> Vec<CartItem> {
        vec![CartItem::new("p1", 1, dec!(10)).with_weight(kg)]
    }

    #[test]
    fn test_cost_is_clamped() {
        let method = shipping(config_map([
            ("base_cost", "2"),
            ("cost_per_kg", "1"),
            ("min_cost", "5"),
            ("max_cost", "20"),
        ]));

        let light = method.calculate_shipping(&parcel(dec!(1)), &address("US"));
        assert_eq!(light.cost, Some(dec!(5)));

        let heavy = method.calculate_shipping(&parcel(dec!(25)), &address("US"));
        assert_eq!(heavy.cost, Some(dec!(20)));

        let middle = method.calculate_shipping(&parcel(dec!(7.5)), &address("US"));
        assert_eq!(middle.cost, Some(dec!(9.5)));
        assert_eq!(middle.message, "Weight-based shipping calculated successfully");
    }

    #[test]
    fn test_max_weight_rejects_order() {
        let method = shipping(config_map([
            ("base_cost", "1"),
            ("cost_per_kg", "1"),
            ("max_weight", "10"),
        ]));

        let result = method.calculate_shipping(&parcel(dec!(11)), &address("US"));
        assert!(!result.available);
        assert_eq!(result.cost, None);
        assert_eq!(result.message, "Order weight exceeds maximum allowed weight");

        let at_limit = method.calculate_shipping(&parcel(dec!(10)), &address("US"));
        assert_eq!(at_limit.cost, Some(dec!(11)));
    }

    #[test]
    fn test_default_item_weight() {
        let method = shipping(config_map([("base_cost", "1"), ("cost_per_kg", "2")]));
        // four items without a weight weigh 2 kg
        let items = vec![CartItem::new("p1", 4, dec!(3))];

        let result = method.calculate_shipping(&items, &address("US"));
        assert_eq!(result.cost, Some(dec!(5)));
    }

    #[test]
    fn test_min_above_max_is_invalid() {
        let method = shipping(config_map([
            ("base_cost", "1"),
            ("cost_per_kg", "1"),
            ("min_cost", "30"),
            ("max_cost", "20"),
        ]));

        let validation = method.validate_config();
        assert!(!validation.valid);
        assert_eq!(
            validation.messages(),
            vec!["Minimum cost cannot be greater than maximum cost"]
        );

        let result = method.calculate_shipping(&parcel(dec!(1)), &address("US"));
        assert!(result.message.starts_with("Invalid configuration: "));
    }

    #[test]
    fn test_validation_messages() {
        let method = shipping(config_map([
            ("cost_per_kg", "-0.5"),
            ("max_weight", "0"),
            ("min_cost", "abc"),
        ]));

        assert_eq!(
            method.validate_config().messages(),
            vec![
                "Field 'base_cost' is required",
                "Field 'min_cost' must be a number",
                "Cost per kg must be a positive number",
                "Maximum weight must be a positive number",
            ]
        );
    }

    #[test]
    fn test_delivery_days_grow_with_weight() {
        let method = shipping(config_map([
            ("base_cost", "1"),
            ("cost_per_kg", "1"),
            ("weight_delivery_multiplier", "0.2"),
        ]));

        assert_eq!(method.estimated_delivery_days(&address("US"), dec!(0)), 3);
        // 3 + ceil(4.5 * 0.2)
        assert_eq!(method.estimated_delivery_days(&address("US"), dec!(4.5)), 4);
        assert_eq!(method.estimated_delivery_days(&address("FI"), dec!(10)), 9);

        let result = method.calculate_shipping(&parcel(dec!(10)), &address("FI"));
        assert_eq!(result.estimated_days, Some(9));
    }

    #[test]
    fn test_no_multiplier_keeps_country_estimate() {
        let method = shipping(config_map([("base_cost", "1"), ("cost_per_kg", "1")]));
        assert_eq!(method.estimated_delivery_days(&address("AU"), dec!(40)), 10);
    }
}
