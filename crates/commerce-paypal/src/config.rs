//! # PayPal Configuration

use commerce_core::config::required_field_errors;
use commerce_core::{ConfigError, ConfigField, ConfigMap, ConfigReader, FieldType};
use std::str::FromStr;

pub const SANDBOX_API_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_API_BASE_URL: &str = "https://api-m.paypal.com";

/// Which PayPal environment to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

impl PayPalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayPalMode::Sandbox => "sandbox",
            PayPalMode::Live => "live",
        }
    }

    pub fn api_base_url(&self) -> &'static str {
        match self {
            PayPalMode::Sandbox => SANDBOX_API_BASE_URL,
            PayPalMode::Live => LIVE_API_BASE_URL,
        }
    }
}

impl FromStr for PayPalMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(PayPalMode::Sandbox),
            "live" => Ok(PayPalMode::Live),
            _ => Err(ConfigError::invalid(
                "mode",
                "Mode must be either \"sandbox\" or \"live\"",
            )),
        }
    }
}

/// PayPal REST app credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayPalSettings {
    pub client_id: String,
    pub client_secret: String,
    pub mode: PayPalMode,
    /// Webhook id from the developer dashboard; needed to verify signatures
    pub webhook_id: Option<String>,
}

impl PayPalSettings {
    pub fn from_config(config: &ConfigMap) -> Result<Self, Vec<ConfigError>> {
        let mut errors = required_field_errors(config, &["client_id", "client_secret", "mode"]);
        let reader = ConfigReader::new(config);

        let mode = match reader.text("mode").map(|m| m.parse::<PayPalMode>()) {
            Some(Ok(mode)) => Some(mode),
            Some(Err(e)) => {
                errors.push(e);
                None
            }
            None => None,
        };

        match (reader.text("client_id"), reader.text("client_secret"), mode) {
            (Some(client_id), Some(client_secret), Some(mode)) if errors.is_empty() => Ok(Self {
                client_id,
                client_secret,
                mode,
                webhook_id: reader.text("webhook_id"),
            }),
            _ => Err(errors),
        }
    }
}

/// Admin form schema
pub fn config_fields() -> Vec<ConfigField> {
    vec![
        ConfigField::new("client_id", FieldType::Text, "Client ID")
            .required()
            .describe("Your PayPal application client ID"),
        ConfigField::new("client_secret", FieldType::Password, "Client Secret")
            .required()
            .describe("Your PayPal application client secret"),
        ConfigField::new("mode", FieldType::Select, "Mode")
            .required()
            .option("sandbox", "Sandbox (Testing)")
            .option("live", "Live (Production)")
            .describe("Choose between sandbox for testing or live for production"),
        ConfigField::new("webhook_id", FieldType::Text, "Webhook ID")
            .describe("ID of the PayPal webhook; required to verify webhook signatures"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use commerce_core::config_map;

    #[test]
    fn test_mode_selects_base_url() {
        assert_eq!(PayPalMode::default().api_base_url(), SANDBOX_API_BASE_URL);
        assert_eq!("live".parse::<PayPalMode>().unwrap().api_base_url(), LIVE_API_BASE_URL);
        assert!("production".parse::<PayPalMode>().is_err());
    }

    #[test]
    fn test_valid_settings() {
        let settings = PayPalSettings::from_config(&config_map([
            ("client_id", "abc"),
            ("client_secret", "shh"),
            ("mode", "live"),
        ]))
        .unwrap();

        assert_eq!(settings.mode, PayPalMode::Live);
        assert_eq!(settings.webhook_id, None);
    }

    #[test]
    fn test_invalid_mode() {
        let errors = PayPalSettings::from_config(&config_map([
            ("client_id", "abc"),
            ("client_secret", "shh"),
            ("mode", "production"),
        ]))
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Mode must be either \"sandbox\" or \"live\"");
    }

    #[test]
    fn test_missing_fields() {
        let errors = PayPalSettings::from_config(&config_map([("client_id", "abc")])).unwrap_err();
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();

        assert_eq!(
            messages,
            vec![
                "Field 'client_secret' is required",
                "Field 'mode' is required"
            ]
        );
    }

    #[test]
    fn test_schema_has_mode_options() {
        let fields = config_fields();
        let mode = fields.iter().find(|f| f.name == "mode").unwrap();

        assert_eq!(mode.field_type, FieldType::Select);
        assert_eq!(mode.options[0].label, "Sandbox (Testing)");
        assert_eq!(mode.options[1].value, "live");
    }
}
