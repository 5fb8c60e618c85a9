//! Cart Aggregate
//!
//! Pure cart math over lines fetched from storage: quantity clamping
//! against available stock, line merging, and subtotal computation. The
//! HTTP layer persists cart rows; this type decides what the quantities
//! and totals should be.

use crate::domain::value_objects::{Money, MoneyError};
use crate::AppError;

#[derive(Clone, Debug)]
pub struct CartLine {
    pub product_id: uuid::Uuid,
    pub variant_id: Option<uuid::Uuid>,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Clone, Debug)]
pub struct Cart {
    lines: Vec<CartLine>,
    currency: String,
}

/// Clamp a requested quantity to what is actually on the shelf.
///
/// Zero stock is an error (the storefront rejects adding an out-of-stock
/// product outright); a request above stock is silently reduced to stock.
pub fn clamp_quantity(requested: u32, stock: i32) -> Result<u32, AppError> {
    if stock <= 0 {
        return Err(AppError::BadRequest("product is out of stock".into()));
    }
    Ok(requested.min(stock as u32))
}

/// Available stock for a cart line: the product's stock, further limited
/// by the variant's own stock when the line carries one.
pub fn available_for_line(product_stock: i32, variant_stock: Option<i32>) -> i32 {
    match variant_stock {
        Some(variant) => product_stock.min(variant),
        None => product_stock,
    }
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self {
            lines: vec![],
            currency: currency.to_string(),
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Add a line, merging with an existing line for the same product and
    /// variant. `replace` swaps the quantity instead of accumulating it.
    pub fn add_line(&mut self, line: CartLine, replace: bool) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id && l.variant_id == line.variant_id)
        {
            if replace {
                existing.quantity = line.quantity;
            } else {
                existing.quantity += line.quantity;
            }
        } else {
            self.lines.push(line);
        }
    }

    /// Errors when a line's currency disagrees with the cart's.
    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        self.lines
            .iter()
            .try_fold(Money::zero(&self.currency), |acc, l| acc.add(&l.line_total()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn line(product: Uuid, qty: u32, unit_minor: i64) -> CartLine {
        CartLine {
            product_id: product,
            variant_id: None,
            name: "Widget".into(),
            sku: "W1".into(),
            quantity: qty,
            unit_price: Money::new(unit_minor, "USD"),
        }
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(3, 10).unwrap(), 3);
        assert_eq!(clamp_quantity(15, 10).unwrap(), 10);
        assert!(clamp_quantity(1, 0).is_err());
        assert!(clamp_quantity(1, -2).is_err());
    }

    #[test]
    fn test_variant_line_limited_by_variant_stock() {
        assert_eq!(available_for_line(10, None), 10);
        assert_eq!(available_for_line(10, Some(2)), 2);
        assert_eq!(available_for_line(1, Some(5)), 1);
        // A quantity update on a variant line caps at the variant, not
        // the parent product.
        assert_eq!(clamp_quantity(5, available_for_line(10, Some(2))).unwrap(), 2);
    }

    #[test]
    fn test_merge_accumulates() {
        let p = Uuid::new_v4();
        let mut cart = Cart::new("USD");
        cart.add_line(line(p, 2, 1000), false);
        cart.add_line(line(p, 1, 1000), false);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.subtotal().unwrap().amount_minor(), 3000);
    }

    #[test]
    fn test_merge_replace_sets_quantity() {
        let p = Uuid::new_v4();
        let mut cart = Cart::new("USD");
        cart.add_line(line(p, 2, 1000), false);
        cart.add_line(line(p, 5, 1000), true);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_variants_are_distinct_lines() {
        let p = Uuid::new_v4();
        let mut a = line(p, 1, 1000);
        a.variant_id = Some(Uuid::new_v4());
        let b = line(p, 1, 1200);
        let mut cart = Cart::new("USD");
        cart.add_line(a, false);
        cart.add_line(b, false);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal().unwrap().amount_minor(), 2200);
    }

    #[test]
    fn test_subtotal_rejects_mixed_currencies() {
        let mut cart = Cart::new("USD");
        cart.add_line(line(Uuid::new_v4(), 1, 1000), false);
        let mut other = line(Uuid::new_v4(), 1, 500);
        other.unit_price = Money::new(500, "EUR");
        cart.add_line(other, false);
        assert!(cart.subtotal().is_err());
    }
}
