//! Value objects

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() {
            return Err(SkuError::Empty);
        }
        if value.len() > 50 {
            return Err(SkuError::TooLong);
        }
        Ok(Self(value))
    }

    /// Generate a fresh `SKU-XXXXXXXX` identifier.
    pub fn generate() -> Self {
        Self(format!("SKU-{:08}", rand::thread_rng().gen_range(0..100_000_000u32)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum SkuError {
    Empty,
    TooLong,
}
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "SKU empty"),
            Self::TooLong => write!(f, "SKU too long"),
        }
    }
}

/// Generate a fresh `ORD-XXXXXXXX` order number.
pub fn order_number() -> String {
    format!("ORD-{:08}", rand::thread_rng().gen_range(0..100_000_000u32))
}

/// Money value object in minor units (cents).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: String,
}

impl Money {
    pub fn new(amount_minor: i64, currency: &str) -> Self {
        Self {
            amount_minor,
            currency: currency.to_string(),
        }
    }

    pub fn zero(currency: &str) -> Self {
        Self::new(0, currency)
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch);
        }
        Ok(Money::new(self.amount_minor + other.amount_minor, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount_minor * i64::from(qty), &self.currency)
    }

    /// Tax at a basis-point rate, rounded down to whole minor units.
    pub fn tax(&self, rate_bps: i64) -> Money {
        Money::new(self.amount_minor * rate_bps / 10_000, &self.currency)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero("USD")
    }
}

#[derive(Debug, Clone)]
pub enum MoneyError {
    CurrencyMismatch,
}
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency mismatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku() {
        let sku = Sku::new("prod-001").unwrap();
        assert_eq!(sku.as_str(), "PROD-001");
        assert!(Sku::new("   ").is_err());
    }

    #[test]
    fn test_sku_generate_shape() {
        let sku = Sku::generate();
        assert!(sku.as_str().starts_with("SKU-"));
        assert_eq!(sku.as_str().len(), 12);
    }

    #[test]
    fn test_order_number_shape() {
        let n = order_number();
        assert!(n.starts_with("ORD-"));
        assert_eq!(n.len(), 12);
    }

    #[test]
    fn test_money_add() {
        let a = Money::new(10_000, "USD");
        let b = Money::new(5_000, "USD");
        assert_eq!(a.add(&b).unwrap().amount_minor(), 15_000);
        assert!(a.add(&Money::new(1, "EUR")).is_err());
    }

    #[test]
    fn test_money_tax() {
        // 7.5% of $20.00 is $1.50.
        assert_eq!(Money::new(2_000, "USD").tax(750).amount_minor(), 150);
        assert_eq!(Money::new(2_000, "USD").tax(0).amount_minor(), 0);
    }
}
