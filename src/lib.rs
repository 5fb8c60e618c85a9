//! Storefront service
//!
//! Self-hosted storefront backend: product catalog, shopping cart,
//! checkout and order lifecycle, payment-method storage, and an
//! administrative back office.
//!
//! ## Features
//! - Product catalog with categories and variants
//! - Session-keyed shopping cart
//! - Checkout with purchase-time price snapshots
//! - Order status / payment state machine with ledgered stock adjustments
//! - Payment webhook ingestion (provider treated as opaque)
//! - Dashboard metrics rollup

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod models;
pub mod services;

use std::sync::Arc;

pub use config::Config;
pub use error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub events: services::events::EventPublisher,
}
