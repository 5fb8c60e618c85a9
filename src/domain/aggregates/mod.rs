//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartLine};
pub use order::{OrderState, OrderStatus, PaymentStatus, StockEffect};
pub use product::ProductStatus;
