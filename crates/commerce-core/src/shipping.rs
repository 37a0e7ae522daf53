//! # Shipping Methods
//!
//! The [`ShippingMethod`] capability trait, the shared [`ShippingBase`], and
//! the [`ShippingManager`] registry that quotes every enabled method and
//! sorts the results by cost.

use crate::activity::{self, LogLevel};
use crate::cart::{Address, CartItem};
use crate::config::{
    self, ConfigError, ConfigField, ConfigMap, ConfigValidation, ShippingMethodRecord,
};
use crate::error::{PaymentError, PaymentResult};
use crate::store::ConfigStore;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

/// State and helpers shared by every shipping method
pub struct ShippingBase {
    name: String,
    display_name: String,
    store: Arc<dyn ConfigStore>,
    record: RwLock<ShippingMethodRecord>,
}

impl ShippingBase {
    /// Create the base and load the persisted record (absent means disabled)
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        let name = name.into();
        let display_name = display_name.into();
        let record = match store.load_shipping_method(&name) {
            Ok(Some(record)) => record,
            Ok(None) => ShippingMethodRecord::disabled(&name, &display_name),
            Err(e) => {
                tracing::warn!(method = %name, error = %e, "Failed to load shipping method record");
                ShippingMethodRecord::disabled(&name, &display_name)
            }
        };

        Self {
            name,
            display_name,
            store,
            record: RwLock::new(record),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_enabled(&self) -> bool {
        self.record().enabled
    }

    pub fn config(&self) -> ConfigMap {
        self.record().config.clone()
    }

    /// Replace the config and persist it. Returns whether the write succeeded.
    pub fn set_config(&self, config: ConfigMap) -> bool {
        self.update(|record| record.config = config)
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.update(|record| record.enabled = enabled)
    }

    pub fn reload(&self) -> bool {
        match self.store.load_shipping_method(&self.name) {
            Ok(record) => {
                *self.record.write().unwrap_or_else(PoisonError::into_inner) = record
                    .unwrap_or_else(|| ShippingMethodRecord::disabled(&self.name, &self.display_name));
                true
            }
            Err(e) => {
                tracing::warn!(method = %self.name, error = %e, "Failed to reload shipping method record");
                false
            }
        }
    }

    pub fn log(&self, level: LogLevel, message: &str, context: &Value) {
        activity::shipping_event(level, &self.name, message, context);
    }

    pub fn required_field_errors(&self, fields: &[&str]) -> Vec<ConfigError> {
        config::required_field_errors(&self.record().config, fields)
    }

    /// Valid address, and the country is in `allowed_countries` when that
    /// list is non-empty (case-insensitive)
    pub fn is_address_allowed(&self, address: &Address, allowed_countries: &[String]) -> bool {
        if !address.is_valid() {
            return false;
        }
        if allowed_countries.is_empty() {
            return true;
        }

        let country = address.country_code();
        allowed_countries
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(&country))
    }

    fn record(&self) -> RwLockReadGuard<'_, ShippingMethodRecord> {
        self.record.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut ShippingMethodRecord)) -> bool {
        let mut record = self.record.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = record.clone();
        apply(&mut updated);
        updated.display_name = self.display_name.clone();

        match self.store.save_shipping_method(&updated) {
            Ok(()) => {
                *record = updated;
                true
            }
            Err(e) => {
                tracing::warn!(method = %self.name, error = %e, "Failed to save shipping method record");
                false
            }
        }
    }
}

/// Result of a single method's `calculate_shipping`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingCalculation {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<u32>,
    pub message: String,
}

impl ShippingCalculation {
    /// Available quote; cost is rounded to cents, half away from zero
    pub fn quoted(cost: Decimal, estimated_days: u32, message: impl Into<String>) -> Self {
        Self {
            available: true,
            cost: Some(cost.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)),
            estimated_days: Some(estimated_days),
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            available: false,
            cost: None,
            estimated_days: None,
            message: message.into(),
        }
    }
}

impl From<PaymentError> for ShippingCalculation {
    fn from(err: PaymentError) -> Self {
        Self::unavailable(err.to_string())
    }
}

/// One entry of `calculate_shipping_options`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub method: String,
    pub display_name: String,
    pub cost: Decimal,
    pub estimated_days: u32,
    pub message: String,
}

/// Admin overview of one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethodStatus {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub exists: bool,
    pub enabled: bool,
    pub valid_config: bool,
    pub config_errors: Vec<String>,
}

/// Capability contract for shipping methods
pub trait ShippingMethod: Send + Sync {
    fn base(&self) -> &ShippingBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn display_name(&self) -> &str {
        self.base().display_name()
    }

    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    fn config(&self) -> ConfigMap {
        self.base().config()
    }

    fn set_config(&self, config: ConfigMap) -> bool {
        self.base().set_config(config)
    }

    fn set_enabled(&self, enabled: bool) -> bool {
        self.base().set_enabled(enabled)
    }

    fn reload(&self) -> bool {
        self.base().reload()
    }

    /// Quote the cart for this address
    fn calculate_shipping(&self, items: &[CartItem], address: &Address) -> ShippingCalculation;

    fn is_available_for_address(&self, address: &Address) -> bool;

    /// Delivery estimate; `total_weight` is the cart weight in kg
    fn estimated_delivery_days(&self, address: &Address, total_weight: Decimal) -> u32;

    fn validate_config(&self) -> ConfigValidation;

    fn config_fields(&self) -> Vec<ConfigField>;
}

pub type BoxedShippingMethod = Arc<dyn ShippingMethod>;

/// Registry of shipping methods, in registration order
#[derive(Clone, Default)]
pub struct ShippingManager {
    methods: Vec<BoxedShippingMethod>,
}

impl ShippingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method; an existing method of the same name is replaced in place
    pub fn register(&mut self, method: BoxedShippingMethod) {
        match self
            .methods
            .iter_mut()
            .find(|existing| existing.name() == method.name())
        {
            Some(slot) => *slot = method,
            None => self.methods.push(method),
        }
    }

    pub fn with_method(mut self, method: BoxedShippingMethod) -> Self {
        self.register(method);
        self
    }

    pub fn methods(&self) -> &[BoxedShippingMethod] {
        &self.methods
    }

    pub fn enabled_shipping_methods(&self) -> Vec<&BoxedShippingMethod> {
        self.methods.iter().filter(|m| m.is_enabled()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&BoxedShippingMethod> {
        self.methods.iter().find(|m| m.name() == name)
    }

    fn require(&self, name: &str) -> PaymentResult<&BoxedShippingMethod> {
        self.get(name)
            .ok_or_else(|| PaymentError::ShippingMethodNotFound {
                name: name.to_string(),
            })
    }

    /// Quote every enabled method and return the available ones, cheapest
    /// first. Equal costs keep registration order.
    pub fn calculate_shipping_options(
        &self,
        items: &[CartItem],
        address: &Address,
    ) -> Vec<ShippingQuote> {
        let mut quotes: Vec<ShippingQuote> = self
            .enabled_shipping_methods()
            .into_iter()
            .filter_map(|method| {
                let calculation = method.calculate_shipping(items, address);
                match (calculation.available, calculation.cost) {
                    (true, Some(cost)) => Some(ShippingQuote {
                        method: method.name().to_string(),
                        display_name: method.display_name().to_string(),
                        cost,
                        estimated_days: calculation.estimated_days.unwrap_or_default(),
                        message: calculation.message,
                    }),
                    _ => None,
                }
            })
            .collect();

        quotes.sort_by(|a, b| a.cost.cmp(&b.cost));
        quotes
    }

    pub fn calculate_shipping(
        &self,
        name: &str,
        items: &[CartItem],
        address: &Address,
    ) -> ShippingCalculation {
        let method = match self.require(name) {
            Ok(method) => method,
            Err(e) => return e.into(),
        };

        if !method.is_enabled() {
            return PaymentError::ShippingMethodDisabled {
                name: name.to_string(),
            }
            .into();
        }

        method.calculate_shipping(items, address)
    }

    /// Form schema, empty for unknown methods
    pub fn config_fields(&self, name: &str) -> Vec<ConfigField> {
        self.get(name)
            .map(|m| m.config_fields())
            .unwrap_or_default()
    }

    pub fn validate_config(&self, name: &str) -> ConfigValidation {
        match self.get(name) {
            Some(method) => method.validate_config(),
            None => ConfigValidation::not_found(format!("Shipping method not found: {}", name)),
        }
    }

    pub fn method_status(&self, name: &str) -> ShippingMethodStatus {
        match self.get(name) {
            Some(method) => status_of(method.as_ref()),
            None => ShippingMethodStatus {
                name: name.to_string(),
                display_name: None,
                exists: false,
                enabled: false,
                valid_config: false,
                config_errors: Vec::new(),
            },
        }
    }

    pub fn all_shipping_method_statuses(&self) -> Vec<ShippingMethodStatus> {
        self.methods.iter().map(|m| status_of(m.as_ref())).collect()
    }

    /// Persist a method's config. `Ok(false)` means the store write failed.
    pub fn set_method_config(&self, name: &str, config: ConfigMap) -> PaymentResult<bool> {
        Ok(self.require(name)?.set_config(config))
    }

    pub fn set_method_enabled(&self, name: &str, enabled: bool) -> PaymentResult<bool> {
        Ok(self.require(name)?.set_enabled(enabled))
    }
}

fn status_of(method: &dyn ShippingMethod) -> ShippingMethodStatus {
    let validation = method.validate_config();
    ShippingMethodStatus {
        name: method.name().to_string(),
        display_name: Some(method.display_name().to_string()),
        exists: true,
        enabled: method.is_enabled(),
        valid_config: validation.valid,
        config_errors: validation.messages(),
    }
}
