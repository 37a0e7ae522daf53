//! # Strategy Configuration
//!
//! Persisted records for gateways and shipping methods, typed validation
//! errors, and the declarative form schema consumed by the admin settings UI.
//!
//! Records carry a flat string map. Each strategy reads that map through a
//! [`ConfigReader`] into its own typed settings struct, so parse failures and
//! missing fields surface as [`ConfigError`]s rather than runtime probing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Raw key/value configuration as persisted by the config store
pub type ConfigMap = BTreeMap<String, String>;

/// Persisted gateway record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRecord {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub config: ConfigMap,
}

impl GatewayRecord {
    pub fn new(name: impl Into<String>, enabled: bool, config: ConfigMap) -> Self {
        Self {
            name: name.into(),
            enabled,
            config,
        }
    }

    /// Record used when nothing has been persisted yet
    pub fn disabled(name: impl Into<String>) -> Self {
        Self::new(name, false, ConfigMap::new())
    }
}

/// Persisted shipping method record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethodRecord {
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    #[serde(default)]
    pub config: ConfigMap,
}

impl ShippingMethodRecord {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        enabled: bool,
        config: ConfigMap,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            enabled,
            config,
        }
    }

    pub fn disabled(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(name, display_name, false, ConfigMap::new())
    }
}

/// Build a [`ConfigMap`] from string pairs
pub fn config_map<K, V, I>(pairs: I) -> ConfigMap
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// What is wrong with a configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigErrorKind {
    /// Field missing or blank
    Required,
    /// Field present but not a number
    NotANumber,
    /// Field present but violates a format or range rule
    Invalid,
}

/// A field-level configuration error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigError {
    pub field: String,
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Field '{}' is required", field),
            field,
            kind: ConfigErrorKind::Required,
        }
    }

    pub fn not_a_number(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Field '{}' must be a number", field),
            field,
            kind: ConfigErrorKind::NotANumber,
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ConfigErrorKind::Invalid,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of `validate_config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<ConfigError>,
}

impl ConfigValidation {
    pub fn from_errors(errors: Vec<ConfigError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Validation result for a strategy name nobody registered
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![ConfigError::invalid("name", message)],
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    /// Convert into `Err(InvalidConfiguration)` when invalid
    pub fn into_result(self) -> crate::PaymentResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(crate::PaymentError::InvalidConfiguration(self.errors))
        }
    }
}

/// `Field '<f>' is required` for every listed field that is missing or blank,
/// in input order.
pub fn required_field_errors(config: &ConfigMap, fields: &[&str]) -> Vec<ConfigError> {
    fields
        .iter()
        .filter(|field| text_value(config, field).is_none())
        .map(|field| ConfigError::required(*field))
        .collect()
}

fn text_value(config: &ConfigMap, key: &str) -> Option<String> {
    config
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Reads typed values out of a [`ConfigMap`], collecting parse errors.
pub struct ConfigReader<'a> {
    config: &'a ConfigMap,
    errors: Vec<ConfigError>,
}

impl<'a> ConfigReader<'a> {
    pub fn new(config: &'a ConfigMap) -> Self {
        Self {
            config,
            errors: Vec::new(),
        }
    }

    /// Trimmed, non-blank string value
    pub fn text(&self, key: &str) -> Option<String> {
        text_value(self.config, key)
    }

    pub fn decimal(&mut self, key: &str) -> Option<Decimal> {
        self.parsed(key)
    }

    pub fn days(&mut self, key: &str) -> Option<i64> {
        self.parsed(key)
    }

    /// Comma-separated list, blanks dropped
    pub fn list(&self, key: &str) -> Vec<String> {
        self.text(key)
            .map(|raw| {
                raw.split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parsed<T: FromStr>(&mut self, key: &str) -> Option<T> {
        let raw = self.text(key)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.errors.push(ConfigError::not_a_number(key));
                None
            }
        }
    }

    /// Parse errors seen so far
    pub fn finish(self) -> Vec<ConfigError> {
        self.errors
    }
}

/// Input widget for a configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Password,
    Number,
    Select,
    SelectMultiple,
}

/// A value/label pair for select widgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
}

/// Declarative description of one admin form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
}

impl ConfigField {
    pub fn new(name: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            description: String::new(),
            options: Vec::new(),
            step: None,
            min: None,
        }
    }

    /// Builder: mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder: set description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: add a select option
    pub fn option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(FieldOption {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    pub fn min(mut self, min: impl Into<String>) -> Self {
        self.min = Some(min.into());
        self
    }
}
