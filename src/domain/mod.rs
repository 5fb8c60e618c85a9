//! Domain module
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::order::{OrderState, OrderStatus, PaymentStatus, StockEffect};
