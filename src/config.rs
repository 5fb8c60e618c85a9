//! Environment-driven service configuration.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    /// Shared secret for verifying payment provider webhook signatures.
    pub webhook_secret: Option<String>,
    pub currency: String,
    /// Flat shipping cost applied at checkout, in minor units.
    pub shipping_cost: i64,
    /// Tax rate applied to the order subtotal, in basis points.
    pub tax_rate_bps: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse().context("PORT must be a number")?,
            Err(_) => 8083,
        };
        Ok(Self {
            database_url,
            port,
            nats_url: std::env::var("NATS_URL").ok(),
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok(),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "USD".to_string()),
            shipping_cost: std::env::var("SHIPPING_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            tax_rate_bps: std::env::var("TAX_RATE_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        })
    }
}
