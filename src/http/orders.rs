//! Checkout and order endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, PaginatedResponse};
use crate::domain::aggregates::order::OrderStatus;
use crate::domain::aggregates::product::effective_price;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{order_number, Money};
use crate::domain::OrderState;
use crate::models::{Order, OrderItem, OrderStatusUpdate};
use crate::services;
use crate::{AppError, AppState, Result};

#[derive(Debug, sqlx::FromRow)]
struct CheckoutLine {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
    name: String,
    sku: String,
    description: Option<String>,
    price: i64,
    variant_name: Option<String>,
    variant_sku: Option<String>,
    price_adjustment: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1))]
    pub session_id: String,
    pub customer_id: Option<Uuid>,
    #[validate(email)]
    pub customer_email: String,
    pub shipping_address: serde_json::Value,
    pub billing_address: Option<serde_json::Value>,
    pub shipping_method: Option<String>,
    pub payment_method: Option<String>,
    pub customer_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Create an order from a cart session.
///
/// Product name, SKU, and price are snapshotted into the order items so
/// later catalog edits cannot rewrite purchase history. Stock is not
/// reserved here; it is committed when the order reaches delivered+paid.
pub async fn checkout(
    State(s): State<AppState>,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    r.validate()?;

    let lines = sqlx::query_as::<_, CheckoutLine>(
        "SELECT ci.product_id, ci.variant_id, ci.quantity, \
                p.name, p.sku, p.description, p.price, \
                v.name AS variant_name, v.sku AS variant_sku, v.price_adjustment \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id AND p.status = 'active' \
         LEFT JOIN product_variants v ON v.id = ci.variant_id \
         WHERE ci.session_id = $1 ORDER BY ci.created_at",
    )
    .bind(&r.session_id)
    .fetch_all(&s.db)
    .await?;
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let currency = s.config.currency.clone();
    let mut subtotal = Money::zero(&currency);
    for line in &lines {
        let unit = Money::new(effective_price(line.price, line.price_adjustment), &currency);
        subtotal = subtotal
            .add(&unit.multiply(line.quantity as u32))
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    let shipping_cost = Money::new(s.config.shipping_cost, &currency);
    let tax = subtotal.tax(s.config.tax_rate_bps);
    let total = subtotal
        .add(&shipping_cost)
        .and_then(|t| t.add(&tax))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut tx = s.db.begin().await?;

    let order: Order = sqlx::query_as(
        "INSERT INTO orders (id, order_number, customer_id, customer_email, status, payment_status, \
         subtotal, shipping_cost, tax, total, currency, shipping_address, billing_address, \
         shipping_method, payment_method, customer_notes, metadata, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, 'pending', 'pending', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, '{}'::jsonb, NOW(), NOW()) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(order_number())
    .bind(r.customer_id)
    .bind(&r.customer_email)
    .bind(subtotal.amount_minor())
    .bind(shipping_cost.amount_minor())
    .bind(tax.amount_minor())
    .bind(total.amount_minor())
    .bind(&currency)
    .bind(&r.shipping_address)
    .bind(r.billing_address.as_ref().unwrap_or(&r.shipping_address))
    .bind(r.shipping_method.as_deref())
    .bind(r.payment_method.as_deref())
    .bind(r.customer_notes.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let unit_price = effective_price(line.price, line.price_adjustment);
        let snapshot = serde_json::json!({
            "name": line.name,
            "description": line.description,
            "price": line.price,
            "price_adjustment": line.price_adjustment,
        });
        let item: OrderItem = sqlx::query_as(
            "INSERT INTO order_items (id, order_id, product_id, variant_id, product_name, variant_name, sku, unit_price, quantity, total, product_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(line.variant_id)
        .bind(&line.name)
        .bind(line.variant_name.as_deref())
        .bind(line.variant_sku.as_deref().unwrap_or(&line.sku))
        .bind(unit_price)
        .bind(line.quantity)
        .bind(unit_price * i64::from(line.quantity))
        .bind(&snapshot)
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }

    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&r.session_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(order = %order.order_number, total = order.total, "order created");
    s.events
        .publish(&DomainEvent::OrderCreated {
            order_id: order.id,
            order_number: order.order_number.clone(),
            total: order.total,
            currency: order.currency.clone(),
        })
        .await;

    Ok((StatusCode::CREATED, Json(OrderWithItems { order, items })))
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Order>>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders \
         WHERE ($1::uuid IS NULL OR customer_id = $1) AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(p.customer_id)
    .bind(p.status.as_deref())
    .bind(i64::from(p.per_page()))
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders \
         WHERE ($1::uuid IS NULL OR customer_id = $1) AND ($2::text IS NULL OR status = $2)",
    )
    .bind(p.customer_id)
    .bind(p.status.as_deref())
    .fetch_one(&s.db)
    .await?;
    Ok(Json(PaginatedResponse {
        data: orders,
        total,
        page: p.page(),
    }))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub status_updates: Vec<OrderStatusUpdate>,
}

pub async fn get_one(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderDetail>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(id)
        .fetch_all(&s.db)
        .await?;
    let status_updates = sqlx::query_as::<_, OrderStatusUpdate>(
        "SELECT * FROM order_status_updates WHERE order_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(OrderDetail {
        order,
        items,
        status_updates,
    }))
}

#[derive(Debug, Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Customer-facing cancellation, allowed while the order has not shipped.
pub async fn cancel(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<CancelRequest>,
) -> Result<Json<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(AppError::NotFound("order"))?;
    let state = OrderState::parse(&order.status, &order.payment_status)?;
    if !state.can_cancel() {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Cancelled.to_string(),
        });
    }

    let updated = services::orders::apply_status_change(
        &s.db,
        &s.events,
        id,
        services::orders::StatusChange {
            status: Some(OrderStatus::Cancelled),
            payment_status: None,
            notes: Some(r.reason.unwrap_or_else(|| "Cancelled by customer".to_string())),
            changed_by: Some("customer".to_string()),
        },
    )
    .await?;
    Ok(Json(updated))
}
