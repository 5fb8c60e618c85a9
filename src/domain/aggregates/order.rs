//! Order lifecycle state machine.
//!
//! An order moves `pending -> processing -> shipped -> delivered`, with
//! side exits to `cancelled` and `refunded` from earlier states. Payment
//! status advances independently. Inventory is touched at exactly two
//! points: committed when the order first reaches delivered+paid, and
//! restored when it later enters cancelled/refunded (or its payment is
//! refunded). [`stock_effect`] is the single place that decides which of
//! those applies to a transition; callers route every status change
//! through it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Cancelled and refunded orders accept no further status changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(AppError::BadRequest(format!("unknown order status: {other}"))),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(AppError::BadRequest(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (status, payment) pair an order is in at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderState {
    pub status: OrderStatus,
    pub payment: PaymentStatus,
}

impl OrderState {
    pub fn new(status: OrderStatus, payment: PaymentStatus) -> Self {
        Self { status, payment }
    }

    pub fn parse(status: &str, payment: &str) -> crate::Result<Self> {
        Ok(Self {
            status: status.parse()?,
            payment: payment.parse()?,
        })
    }

    /// Customers may cancel while the order has not shipped.
    pub fn can_cancel(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Refunds apply to paid orders that are not already closed out.
    pub fn can_refund(&self) -> bool {
        !self.status.is_terminal() && self.payment == PaymentStatus::Paid
    }

    fn is_settled(&self) -> bool {
        self.status == OrderStatus::Delivered && self.payment == PaymentStatus::Paid
    }
}

/// What a transition does to inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockEffect {
    /// Decrement product/variant stock by the order's quantities.
    Commit,
    /// Give back whatever the commit ledger recorded for the order.
    Restore,
    None,
}

/// Decide the inventory side effect of moving an order from one state to
/// another.
///
/// Commit fires when delivered+paid first becomes true as a conjunction,
/// not when either half flips on its own. Restore fires when the order
/// leaves the active statuses for cancelled/refunded, or when its payment
/// is refunded in place. The two cannot both apply to one transition.
pub fn stock_effect(from: OrderState, to: OrderState) -> StockEffect {
    if !from.is_settled() && to.is_settled() {
        return StockEffect::Commit;
    }
    let entered_terminal = to.status.is_terminal() && !from.status.is_terminal();
    let payment_refunded =
        to.payment == PaymentStatus::Refunded && from.payment != PaymentStatus::Refunded;
    if entered_terminal || payment_refunded {
        return StockEffect::Restore;
    }
    StockEffect::None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: OrderStatus, payment: PaymentStatus) -> OrderState {
        OrderState::new(status, payment)
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "processing", "shipped", "delivered", "cancelled", "refunded"] {
            let parsed: OrderStatus = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!("completed".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_commit_on_delivery_of_paid_order() {
        let from = state(OrderStatus::Shipped, PaymentStatus::Paid);
        let to = state(OrderStatus::Delivered, PaymentStatus::Paid);
        assert_eq!(stock_effect(from, to), StockEffect::Commit);
    }

    #[test]
    fn test_commit_on_late_payment_of_delivered_order() {
        let from = state(OrderStatus::Delivered, PaymentStatus::Pending);
        let to = state(OrderStatus::Delivered, PaymentStatus::Paid);
        assert_eq!(stock_effect(from, to), StockEffect::Commit);
    }

    #[test]
    fn test_no_commit_on_unpaid_delivery() {
        let from = state(OrderStatus::Shipped, PaymentStatus::Pending);
        let to = state(OrderStatus::Delivered, PaymentStatus::Pending);
        assert_eq!(stock_effect(from, to), StockEffect::None);
    }

    #[test]
    fn test_no_double_commit() {
        // Already settled; a no-op save must not decrement again.
        let settled = state(OrderStatus::Delivered, PaymentStatus::Paid);
        assert_eq!(stock_effect(settled, settled), StockEffect::None);
    }

    #[test]
    fn test_restore_on_cancel() {
        let from = state(OrderStatus::Processing, PaymentStatus::Paid);
        let to = state(OrderStatus::Cancelled, PaymentStatus::Paid);
        assert_eq!(stock_effect(from, to), StockEffect::Restore);
    }

    #[test]
    fn test_restore_on_refund_after_delivery() {
        let from = state(OrderStatus::Delivered, PaymentStatus::Paid);
        let to = state(OrderStatus::Refunded, PaymentStatus::Refunded);
        assert_eq!(stock_effect(from, to), StockEffect::Restore);
    }

    #[test]
    fn test_restore_on_payment_refund_without_status_change() {
        let from = state(OrderStatus::Delivered, PaymentStatus::Paid);
        let to = state(OrderStatus::Delivered, PaymentStatus::Refunded);
        assert_eq!(stock_effect(from, to), StockEffect::Restore);
    }

    #[test]
    fn test_no_restore_when_already_terminal() {
        let from = state(OrderStatus::Cancelled, PaymentStatus::Pending);
        let to = state(OrderStatus::Refunded, PaymentStatus::Pending);
        // Still terminal; already restored once.
        assert_eq!(stock_effect(from, to), StockEffect::None);
    }

    #[test]
    fn test_plain_progression_has_no_effect() {
        let from = state(OrderStatus::Pending, PaymentStatus::Pending);
        let to = state(OrderStatus::Processing, PaymentStatus::Paid);
        assert_eq!(stock_effect(from, to), StockEffect::None);
    }

    #[test]
    fn test_can_cancel_window() {
        assert!(state(OrderStatus::Pending, PaymentStatus::Pending).can_cancel());
        assert!(state(OrderStatus::Processing, PaymentStatus::Paid).can_cancel());
        assert!(!state(OrderStatus::Shipped, PaymentStatus::Paid).can_cancel());
        assert!(!state(OrderStatus::Delivered, PaymentStatus::Paid).can_cancel());
    }

    #[test]
    fn test_can_refund_requires_payment() {
        assert!(state(OrderStatus::Delivered, PaymentStatus::Paid).can_refund());
        assert!(!state(OrderStatus::Delivered, PaymentStatus::Pending).can_refund());
        assert!(!state(OrderStatus::Refunded, PaymentStatus::Refunded).can_refund());
    }
}
