//! Product Aggregate

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Products below this stock level are surfaced on the admin dashboard.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    #[default]
    Active,
    Archived,
    Deleted,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_purchasable(&self) -> bool {
        *self == Self::Active
    }
}

impl FromStr for ProductStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            other => Err(AppError::BadRequest(format!(
                "unknown product status: {other}"
            ))),
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_low_stock(stock: i32) -> bool {
    stock < LOW_STOCK_THRESHOLD
}

/// Mean review rating, `None` when there are no reviews.
pub fn average_rating(ratings: &[i32]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    Some(sum as f64 / ratings.len() as f64)
}

/// Unit price for a product plus an optional variant adjustment, floored
/// at zero so a discount variant can never produce a negative price.
pub fn effective_price(base: i64, adjustment: Option<i64>) -> i64 {
    (base + adjustment.unwrap_or(0)).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("active".parse::<ProductStatus>().unwrap(), ProductStatus::Active);
        assert!("published".parse::<ProductStatus>().is_err());
        assert!(ProductStatus::Active.is_purchasable());
        assert!(!ProductStatus::Archived.is_purchasable());
    }

    #[test]
    fn test_low_stock() {
        assert!(is_low_stock(0));
        assert!(is_low_stock(9));
        assert!(!is_low_stock(10));
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[4]), Some(4.0));
        let avg = average_rating(&[5, 4, 4]).unwrap();
        assert!((avg - 13.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(effective_price(1000, None), 1000);
        assert_eq!(effective_price(1000, Some(250)), 1250);
        assert_eq!(effective_price(1000, Some(-300)), 700);
        assert_eq!(effective_price(1000, Some(-1500)), 0);
    }
}
