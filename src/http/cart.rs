//! Session-keyed shopping cart endpoints.
//!
//! Cart rows persist (session_id, product_id, variant_id, quantity);
//! prices are always read live from the catalog, so a cart never holds a
//! stale price. Quantities are clamped to available stock on every write,
//! and lines whose product has gone inactive are dropped on read.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::cart::{available_for_line, clamp_quantity, Cart, CartLine};
use crate::domain::aggregates::product::effective_price;
use crate::domain::value_objects::Money;
use crate::{AppError, AppState, Result};

#[derive(Debug, sqlx::FromRow)]
struct JoinedCartRow {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
    name: String,
    sku: String,
    price: i64,
    currency: String,
    variant_name: Option<String>,
    variant_sku: Option<String>,
    price_adjustment: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub variant_name: Option<String>,
    pub sku: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub session_id: String,
    pub items: Vec<CartItemView>,
    pub item_count: i64,
    pub subtotal: i64,
    pub currency: String,
}

async fn load_cart(s: &AppState, session: &str) -> Result<CartView> {
    // Drop lines whose product is no longer purchasable.
    sqlx::query(
        "DELETE FROM cart_items WHERE session_id = $1 \
         AND product_id NOT IN (SELECT id FROM products WHERE status = 'active')",
    )
    .bind(session)
    .execute(&s.db)
    .await?;

    let rows = sqlx::query_as::<_, JoinedCartRow>(
        "SELECT ci.product_id, ci.variant_id, ci.quantity, \
                p.name, p.sku, p.price, p.currency, \
                v.name AS variant_name, v.sku AS variant_sku, v.price_adjustment \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id AND p.status = 'active' \
         LEFT JOIN product_variants v ON v.id = ci.variant_id \
         WHERE ci.session_id = $1 ORDER BY ci.created_at",
    )
    .bind(session)
    .fetch_all(&s.db)
    .await?;

    let mut cart = Cart::new(&s.config.currency);
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let unit_price = effective_price(row.price, row.price_adjustment);
        let sku = row.variant_sku.unwrap_or(row.sku);
        let line = CartLine {
            product_id: row.product_id,
            variant_id: row.variant_id,
            name: row.name.clone(),
            sku: sku.clone(),
            quantity: row.quantity as u32,
            unit_price: Money::new(unit_price, &row.currency),
        };
        items.push(CartItemView {
            product_id: row.product_id,
            variant_id: row.variant_id,
            name: row.name,
            variant_name: row.variant_name,
            sku,
            quantity: row.quantity,
            unit_price,
            line_total: line.line_total().amount_minor(),
        });
        cart.add_line(line, false);
    }

    let subtotal = cart
        .subtotal()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(CartView {
        session_id: session.to_string(),
        items,
        item_count: i64::from(cart.item_count()),
        subtotal: subtotal.amount_minor(),
        currency: s.config.currency.clone(),
    })
}

async fn fetch_variant_stock(s: &AppState, variant_id: Uuid, product_id: Uuid) -> Result<i32> {
    let variant: Option<(i32,)> = sqlx::query_as(
        "SELECT stock FROM product_variants WHERE id = $1 AND product_id = $2 AND is_active",
    )
    .bind(variant_id)
    .bind(product_id)
    .fetch_optional(&s.db)
    .await?;
    let (stock,) = variant.ok_or(AppError::NotFound("product variant"))?;
    Ok(stock)
}

pub async fn get_cart(
    State(s): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<CartView>> {
    Ok(Json(load_cart(&s, &session).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Replace the line quantity instead of accumulating into it.
    #[serde(default)]
    pub set_quantity: bool,
}

pub async fn add_item(
    State(s): State<AppState>,
    Path(session): Path<String>,
    Json(r): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    r.validate()?;

    let product: Option<(i32,)> =
        sqlx::query_as("SELECT stock FROM products WHERE id = $1 AND status = 'active'")
            .bind(r.product_id)
            .fetch_optional(&s.db)
            .await?;
    let (product_stock,) = product.ok_or(AppError::NotFound("product"))?;

    let variant_stock = match r.variant_id {
        Some(variant_id) => Some(fetch_variant_stock(&s, variant_id, r.product_id).await?),
        None => None,
    };
    let available = available_for_line(product_stock, variant_stock);

    let existing: Option<(Uuid, i32)> = sqlx::query_as(
        "SELECT id, quantity FROM cart_items \
         WHERE session_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3",
    )
    .bind(&session)
    .bind(r.product_id)
    .bind(r.variant_id)
    .fetch_optional(&s.db)
    .await?;

    match existing {
        Some((id, current)) => {
            let requested = if r.set_quantity {
                r.quantity
            } else {
                current.saturating_add(r.quantity)
            };
            let quantity = clamp_quantity(requested as u32, available)? as i32;
            sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
                .bind(id)
                .bind(quantity)
                .execute(&s.db)
                .await?;
        }
        None => {
            let quantity = clamp_quantity(r.quantity as u32, available)? as i32;
            sqlx::query(
                "INSERT INTO cart_items (id, session_id, product_id, variant_id, quantity, created_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW())",
            )
            .bind(Uuid::now_v7())
            .bind(&session)
            .bind(r.product_id)
            .bind(r.variant_id)
            .bind(quantity)
            .execute(&s.db)
            .await?;
        }
    }

    Ok((StatusCode::CREATED, Json(load_cart(&s, &session).await?)))
}

#[derive(Debug, Deserialize)]
pub struct LineParams {
    pub variant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 0))]
    pub quantity: i32,
}

pub async fn update_item(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
    Query(q): Query<LineParams>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    r.validate()?;

    if r.quantity == 0 {
        sqlx::query(
            "DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2 \
             AND variant_id IS NOT DISTINCT FROM $3",
        )
        .bind(&session)
        .bind(product_id)
        .bind(q.variant_id)
        .execute(&s.db)
        .await?;
        return Ok(Json(load_cart(&s, &session).await?));
    }

    let product: Option<(i32,)> =
        sqlx::query_as("SELECT stock FROM products WHERE id = $1 AND status = 'active'")
            .bind(product_id)
            .fetch_optional(&s.db)
            .await?;
    let (stock,) = product.ok_or(AppError::NotFound("product"))?;
    let variant_stock = match q.variant_id {
        Some(variant_id) => Some(fetch_variant_stock(&s, variant_id, product_id).await?),
        None => None,
    };
    let quantity = clamp_quantity(r.quantity as u32, available_for_line(stock, variant_stock))? as i32;

    let updated = sqlx::query(
        "UPDATE cart_items SET quantity = $4 WHERE session_id = $1 AND product_id = $2 \
         AND variant_id IS NOT DISTINCT FROM $3",
    )
    .bind(&session)
    .bind(product_id)
    .bind(q.variant_id)
    .bind(quantity)
    .execute(&s.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("cart item"));
    }

    Ok(Json(load_cart(&s, &session).await?))
}

pub async fn remove_item(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
    Query(q): Query<LineParams>,
) -> Result<Json<CartView>> {
    // Without a variant filter this removes every line for the product.
    sqlx::query(
        "DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2 \
         AND ($3::uuid IS NULL OR variant_id = $3)",
    )
    .bind(&session)
    .bind(product_id)
    .bind(q.variant_id)
    .execute(&s.db)
    .await?;
    Ok(Json(load_cart(&s, &session).await?))
}

pub async fn clear(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&session)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
