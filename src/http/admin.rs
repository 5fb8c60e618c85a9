//! Back-office endpoints: dashboard metrics, order status management,
//! refunds, contact messages.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ListParams;
use crate::domain::aggregates::order::{OrderStatus, PaymentStatus};
use crate::domain::aggregates::product::LOW_STOCK_THRESHOLD;
use crate::models::{
    ContactMessage, DailySale, Dashboard, Order, ProductReview, Refund, Transaction,
};
use crate::services;
use crate::{AppError, AppState, Result};

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    #[serde(flatten)]
    pub metrics: Dashboard,
    pub weekly_revenue: i64,
    pub low_stock_products: i64,
    pub recent_orders: i64,
    pub daily_sales: Vec<DailySale>,
    pub recent_orders_list: Vec<Order>,
}

/// Recompute and return the dashboard rollup plus trailing-week detail.
pub async fn dashboard(State(s): State<AppState>) -> Result<Json<AdminDashboard>> {
    let mut conn = s.db.acquire().await?;
    let metrics = services::dashboard::refresh(&mut conn).await?;
    let daily_sales = services::dashboard::daily_sales(&mut conn).await?;

    let (weekly_revenue,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total), 0)::BIGINT FROM orders \
         WHERE status = 'delivered' AND payment_status = 'paid' \
         AND created_at >= NOW() - INTERVAL '7 days'",
    )
    .fetch_one(&mut *conn)
    .await?;
    let (low_stock_products,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE status = 'active' AND stock < $1",
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_one(&mut *conn)
    .await?;
    let (recent_orders,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE created_at >= NOW() - INTERVAL '7 days'",
    )
    .fetch_one(&mut *conn)
    .await?;
    let recent_orders_list = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(AdminDashboard {
        metrics,
        weekly_revenue,
        low_stock_products,
        recent_orders,
        daily_sales,
        recent_orders_list,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub notes: Option<String>,
    pub changed_by: Option<String>,
}

/// Staff-driven order transition. Runs through the shared transition
/// handler: audit record, stock effect, refund record, and dashboard
/// refresh happen in one transaction, and an insufficient-stock failure
/// persists nothing.
pub async fn update_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>> {
    let status = r.status.as_deref().map(str::parse::<OrderStatus>).transpose()?;
    let payment_status = r
        .payment_status
        .as_deref()
        .map(str::parse::<PaymentStatus>)
        .transpose()?;
    if status.is_none() && payment_status.is_none() {
        return Err(AppError::BadRequest(
            "status or payment_status is required".into(),
        ));
    }

    let order = services::orders::apply_status_change(
        &s.db,
        &s.events,
        id,
        services::orders::StatusChange {
            status,
            payment_status,
            notes: r.notes,
            changed_by: r.changed_by.or_else(|| Some("staff".to_string())),
        },
    )
    .await?;
    Ok(Json(order))
}

pub async fn list_refunds(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Refund>>> {
    let refunds = sqlx::query_as::<_, Refund>(
        "SELECT * FROM refunds WHERE order_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(refunds))
}

pub async fn list_transactions(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>> {
    let transactions = sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE order_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(transactions))
}

pub async fn list_pending_reviews(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Vec<ProductReview>>> {
    let reviews = sqlx::query_as::<_, ProductReview>(
        "SELECT * FROM product_reviews WHERE NOT is_approved \
         ORDER BY created_at LIMIT $1 OFFSET $2",
    )
    .bind(i64::from(p.per_page()))
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    Ok(Json(reviews))
}

pub async fn approve_review(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductReview>> {
    sqlx::query_as::<_, ProductReview>(
        "UPDATE product_reviews SET is_approved = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("review"))
}

pub async fn list_contact_messages(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Vec<ContactMessage>>> {
    let unread_only = p.status.as_deref() == Some("unread");
    let messages = sqlx::query_as::<_, ContactMessage>(
        "SELECT * FROM contact_messages WHERE (NOT $1 OR NOT is_read) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(unread_only)
    .bind(i64::from(p.per_page()))
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    Ok(Json(messages))
}

pub async fn mark_message_read(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactMessage>> {
    sqlx::query_as::<_, ContactMessage>(
        "UPDATE contact_messages SET is_read = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&s.db)
    .await?
    .map(Json)
    .ok_or(AppError::NotFound("contact message"))
}
