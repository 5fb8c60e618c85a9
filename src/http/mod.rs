//! HTTP API: routing and shared request/response types.

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod admin;
pub mod cart;
pub mod contact;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(products::list).post(products::create))
        .route(
            "/api/v1/products/:id",
            get(products::get_one).put(products::update).delete(products::remove),
        )
        .route(
            "/api/v1/products/:id/variants",
            get(products::list_variants).post(products::create_variant),
        )
        .route(
            "/api/v1/products/:id/reviews",
            get(products::list_reviews).post(products::create_review),
        )
        .route(
            "/api/v1/categories",
            get(products::list_categories).post(products::create_category),
        )
        .route(
            "/api/v1/brands",
            get(products::list_brands).post(products::create_brand),
        )
        .route("/api/v1/brands/:id", get(products::get_brand))
        .route("/api/v1/categories/:id", get(products::get_category))
        .route(
            "/api/v1/cart/:session",
            get(cart::get_cart).post(cart::add_item).delete(cart::clear),
        )
        .route(
            "/api/v1/cart/:session/items/:product_id",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders", get(orders::list))
        .route("/api/v1/orders/:id", get(orders::get_one))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel))
        .route("/api/v1/customers", post(customers::create))
        .route("/api/v1/customers/:id", get(customers::get_one))
        .route(
            "/api/v1/customers/:id/payment-methods",
            get(payments::list_methods).post(payments::create_method),
        )
        .route(
            "/api/v1/customers/:id/payment-methods/:pm_id",
            delete(payments::remove_method),
        )
        .route(
            "/api/v1/customers/:id/payment-methods/:pm_id/default",
            put(payments::set_default_method),
        )
        .route("/api/v1/payments/webhook", post(payments::webhook))
        .route("/api/v1/contact", post(contact::submit))
        .route("/api/v1/admin/dashboard", get(admin::dashboard))
        .route("/api/v1/admin/orders/:id/status", put(admin::update_order_status))
        .route("/api/v1/admin/orders/:id/refunds", get(admin::list_refunds))
        .route(
            "/api/v1/admin/orders/:id/transactions",
            get(admin::list_transactions),
        )
        .route("/api/v1/admin/reviews", get(admin::list_pending_reviews))
        .route(
            "/api/v1/admin/reviews/:id/approve",
            put(admin::approve_review),
        )
        .route("/api/v1/admin/contact-messages", get(admin::list_contact_messages))
        .route(
            "/api/v1/admin/contact-messages/:id/read",
            put(admin::mark_message_read),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<uuid::Uuid>,
    pub brand: Option<uuid::Uuid>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub customer_id: Option<uuid::Uuid>,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).min(100)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_defaults() {
        let p = ListParams::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_offset_survives_hostile_page_values() {
        let p = ListParams {
            page: Some(u32::MAX),
            per_page: Some(100),
            ..Default::default()
        };
        assert_eq!(p.offset(), (i64::from(u32::MAX) - 1) * 100);

        let p = ListParams {
            page: Some(0),
            ..Default::default()
        };
        assert_eq!(p.offset(), 0);
    }
}
