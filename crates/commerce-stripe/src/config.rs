//! # Stripe Configuration
//!
//! Typed settings parsed from the gateway's persisted config map.

use commerce_core::config::required_field_errors;
use commerce_core::{ConfigError, ConfigField, ConfigMap, ConfigReader, FieldType};

/// Stripe REST API root
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com/v1";

/// Stripe API credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeSettings {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Publishable key (pk_test_... or pk_live_...)
    pub publishable_key: String,

    /// Webhook signing secret; signature checks fail without it
    pub webhook_secret: Option<String>,
}

impl StripeSettings {
    /// Parse and validate the config map
    pub fn from_config(config: &ConfigMap) -> Result<Self, Vec<ConfigError>> {
        let mut errors = required_field_errors(config, &["secret_key", "publishable_key"]);
        let reader = ConfigReader::new(config);

        let secret_key = reader.text("secret_key");
        let publishable_key = reader.text("publishable_key");

        if secret_key
            .as_deref()
            .is_some_and(|key| !has_key_prefix(key, "sk_"))
        {
            errors.push(ConfigError::invalid(
                "secret_key",
                "Invalid Stripe secret key format",
            ));
        }

        if publishable_key
            .as_deref()
            .is_some_and(|key| !has_key_prefix(key, "pk_"))
        {
            errors.push(ConfigError::invalid(
                "publishable_key",
                "Invalid Stripe publishable key format",
            ));
        }

        match (secret_key, publishable_key) {
            (Some(secret_key), Some(publishable_key)) if errors.is_empty() => Ok(Self {
                secret_key,
                publishable_key,
                webhook_secret: reader.text("webhook_secret"),
            }),
            _ => Err(errors),
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }
}

/// `sk_test_...`/`sk_live_...` style prefix check
fn has_key_prefix(key: &str, kind: &str) -> bool {
    key.strip_prefix(kind)
        .is_some_and(|rest| rest.starts_with("test_") || rest.starts_with("live_"))
}

/// Admin form schema
pub fn config_fields() -> Vec<ConfigField> {
    vec![
        ConfigField::new("publishable_key", FieldType::Text, "Publishable Key")
            .required()
            .describe("Your Stripe publishable key (starts with pk_)"),
        ConfigField::new("secret_key", FieldType::Password, "Secret Key")
            .required()
            .describe("Your Stripe secret key (starts with sk_)"),
        ConfigField::new("webhook_secret", FieldType::Password, "Webhook Secret")
            .describe("Your Stripe webhook endpoint secret"),
    ]
}
