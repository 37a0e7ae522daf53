//! Country delivery estimates and the country picker shared by both methods.

use commerce_core::{ConfigField, FieldType};

/// Used when a country is not listed and no default is configured
pub const FALLBACK_DELIVERY_DAYS: u32 = 7;

const DELIVERY_DAYS: [(&str, u32); 16] = [
    ("US", 3),
    ("CA", 5),
    ("GB", 7),
    ("AU", 10),
    ("DE", 5),
    ("FR", 5),
    ("IT", 5),
    ("ES", 5),
    ("NL", 5),
    ("BE", 5),
    ("AT", 5),
    ("CH", 5),
    ("SE", 7),
    ("NO", 7),
    ("DK", 7),
    ("FI", 7),
];

/// Countries offered in the admin allow-list picker
pub const COUNTRY_OPTIONS: [(&str, &str); 16] = [
    ("US", "United States"),
    ("CA", "Canada"),
    ("GB", "United Kingdom"),
    ("AU", "Australia"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("NL", "Netherlands"),
    ("BE", "Belgium"),
    ("AT", "Austria"),
    ("CH", "Switzerland"),
    ("SE", "Sweden"),
    ("NO", "Norway"),
    ("DK", "Denmark"),
    ("FI", "Finland"),
];

/// Days for an upper-case country code; unlisted countries get
/// `configured_default`, then [`FALLBACK_DELIVERY_DAYS`]
pub fn base_delivery_days(country_code: &str, configured_default: Option<u32>) -> u32 {
    DELIVERY_DAYS
        .iter()
        .find(|(code, _)| *code == country_code)
        .map(|(_, days)| *days)
        .or(configured_default)
        .unwrap_or(FALLBACK_DELIVERY_DAYS)
}

pub(crate) fn default_delivery_days_field() -> ConfigField {
    ConfigField::new("default_delivery_days", FieldType::Number, "Default Delivery Days")
        .min("1")
        .describe("Default delivery time in days for countries not specifically configured")
}

pub(crate) fn allowed_countries_field() -> ConfigField {
    COUNTRY_OPTIONS.iter().fold(
        ConfigField::new("allowed_countries", FieldType::SelectMultiple, "Allowed Countries")
            .describe(
                "Countries where this shipping method is available (leave empty for all countries)",
            ),
        |field, (code, label)| field.option(*code, *label),
    )
}
