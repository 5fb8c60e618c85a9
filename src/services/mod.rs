//! Services module
pub mod dashboard;
pub mod events;
pub mod orders;
pub mod stock;
pub mod webhook;
