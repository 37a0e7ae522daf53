//! # Money
//!
//! Currency codes and minor-unit conversion. Amounts are `rust_decimal::Decimal`
//! in major units (dollars, euros); providers that bill in minor units get
//! them through [`Currency::to_minor_units`].

use crate::error::{PaymentError, PaymentResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 codes whose minor unit equals the major unit.
pub const ZERO_DECIMAL_CURRENCIES: [&str; 16] = [
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// ISO 4217 currency code, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// Upper-case code ("USD")
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Lower-case code, as Stripe expects it ("usd")
    pub fn lowercase(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn is_zero_decimal(&self) -> bool {
        ZERO_DECIMAL_CURRENCIES.contains(&self.0.as_str())
    }

    /// Number of decimal places in the minor unit
    pub fn decimal_places(&self) -> u32 {
        if self.is_zero_decimal() {
            0
        } else {
            2
        }
    }

    /// Convert a major-unit amount to the provider's smallest unit.
    ///
    /// Two-decimal currencies are multiplied by 100 and rounded half away from
    /// zero; zero-decimal currencies pass through (rounded to a whole unit).
    pub fn to_minor_units(&self, amount: Decimal) -> PaymentResult<i64> {
        let scaled = if self.is_zero_decimal() {
            amount
        } else {
            amount * Decimal::ONE_HUNDRED
        };

        scaled
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| {
                PaymentError::InvalidRequest(format!("Amount out of range: {}", amount))
            })
    }

    /// Convert from the provider's smallest unit back to major units
    pub fn from_minor_units(&self, amount: i64) -> Decimal {
        if self.is_zero_decimal() {
            Decimal::from(amount)
        } else {
            Decimal::new(amount, 2)
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::new("USD")
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Currency::new(code)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Currency::new(code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format an amount with exactly two decimal places ("10.00").
pub fn two_decimal_string(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_conversion() {
        let usd = Currency::new("usd");
        assert_eq!(usd.code(), "USD");
        assert_eq!(usd.to_minor_units(dec!(10.99)).unwrap(), 1099);
        assert_eq!(usd.from_minor_units(1099), dec!(10.99));

        let jpy = Currency::new("JPY");
        assert_eq!(jpy.to_minor_units(dec!(1000)).unwrap(), 1000);
        assert_eq!(jpy.from_minor_units(1000), dec!(1000));
    }

    #[test]
    fn test_zero_decimal_table() {
        for code in ZERO_DECIMAL_CURRENCIES {
            assert!(Currency::new(code).is_zero_decimal(), "{code}");
            assert_eq!(Currency::new(code).decimal_places(), 0);
        }
        for code in ["USD", "EUR", "GBP", "CAD", "MXN", "CHF"] {
            assert!(!Currency::new(code).is_zero_decimal(), "{code}");
        }
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        let usd = Currency::default();
        assert_eq!(usd.to_minor_units(dec!(0.125)).unwrap(), 13);
        assert_eq!(usd.to_minor_units(dec!(0.135)).unwrap(), 14);
        assert_eq!(usd.to_minor_units(dec!(19.999)).unwrap(), 2000);
    }

    #[test]
    fn test_two_decimal_string() {
        assert_eq!(two_decimal_string(dec!(10)), "10.00");
        assert_eq!(two_decimal_string(dec!(10.5)), "10.50");
        assert_eq!(two_decimal_string(dec!(10.005)), "10.01");
    }

    #[test]
    fn test_serde_normalises_code() {
        let currency: Currency = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(currency.code(), "EUR");
        assert_eq!(serde_json::to_string(&currency).unwrap(), "\"EUR\"");
    }

    proptest! {
        #[test]
        fn two_decimal_amounts_survive_minor_unit_round_trip(cents in 0i64..1_000_000_000) {
            let usd = Currency::new("USD");
            let amount = Decimal::new(cents, 2);
            let minor = usd.to_minor_units(amount).unwrap();
            prop_assert_eq!(minor, cents);
            prop_assert_eq!(usd.from_minor_units(minor), amount);
        }

        #[test]
        fn zero_decimal_amounts_are_identity(units in 0i64..1_000_000_000) {
            let jpy = Currency::new("JPY");
            let amount = Decimal::from(units);
            prop_assert_eq!(jpy.to_minor_units(amount).unwrap(), units);
            prop_assert_eq!(jpy.from_minor_units(units), amount);
        }
    }
}
