//! Order status transition orchestration.
//!
//! All status and payment-status changes flow through
//! [`apply_status_change`]: the admin back office, customer cancellation,
//! and the payment webhook. One transaction covers the order update, the
//! audit record, the stock adjustment, the refund record, and the
//! dashboard refresh, so a failed stock decrement leaves nothing behind.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::order::{
    stock_effect, OrderState, OrderStatus, PaymentStatus, StockEffect,
};
use crate::domain::events::DomainEvent;
use crate::models::Order;
use crate::services::events::EventPublisher;
use crate::services::{dashboard, stock};
use crate::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct StatusChange {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    pub changed_by: Option<String>,
}

pub async fn apply_status_change(
    db: &PgPool,
    events: &EventPublisher,
    order_id: Uuid,
    change: StatusChange,
) -> Result<Order> {
    let mut tx = db.begin().await?;

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("order"))?;

    let from = OrderState::parse(&order.status, &order.payment_status)?;
    let mut to = OrderState::new(
        change.status.unwrap_or(from.status),
        change.payment_status.unwrap_or(from.payment),
    );

    // Refunding a paid order also flips its payment status.
    if to.status == OrderStatus::Refunded
        && from.payment == PaymentStatus::Paid
        && change.payment_status.is_none()
    {
        to.payment = PaymentStatus::Refunded;
    }

    if from == to {
        tx.commit().await?;
        return Ok(order);
    }

    if from.status.is_terminal() && to.status != from.status {
        return Err(AppError::InvalidTransition {
            from: from.status.to_string(),
            to: to.status.to_string(),
        });
    }

    let effect = stock_effect(from, to);
    let stock_touched = match effect {
        StockEffect::Commit => stock::commit_for_order(&mut tx, order_id).await?,
        StockEffect::Restore => stock::restore_for_order(&mut tx, order_id).await?,
        StockEffect::None => false,
    };

    let paid_at = (to.payment == PaymentStatus::Paid && from.payment != PaymentStatus::Paid)
        .then(chrono::Utc::now);
    let shipped_at = (to.status == OrderStatus::Shipped && from.status != OrderStatus::Shipped)
        .then(chrono::Utc::now);
    let delivered_at = (to.status == OrderStatus::Delivered
        && from.status != OrderStatus::Delivered)
        .then(chrono::Utc::now);

    let updated: Order = sqlx::query_as(
        "UPDATE orders SET status = $2, payment_status = $3, updated_at = NOW(), \
         paid_at = COALESCE(paid_at, $4), shipped_at = COALESCE(shipped_at, $5), \
         delivered_at = COALESCE(delivered_at, $6) \
         WHERE id = $1 RETURNING *",
    )
    .bind(order_id)
    .bind(to.status.as_str())
    .bind(to.payment.as_str())
    .bind(paid_at)
    .bind(shipped_at)
    .bind(delivered_at)
    .fetch_one(&mut *tx)
    .await?;

    if to.status != from.status {
        sqlx::query(
            "INSERT INTO order_status_updates (id, order_id, status, notes, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(to.status.as_str())
        .bind(change.notes.as_deref())
        .bind(change.changed_by.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    if to.status == OrderStatus::Refunded && from.payment == PaymentStatus::Paid {
        sqlx::query(
            "INSERT INTO refunds (id, order_id, status, amount, reason, processed_at, created_at, updated_at) \
             VALUES ($1, $2, 'completed', $3, $4, NOW(), NOW(), NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(order.total)
        .bind(
            change
                .notes
                .clone()
                .unwrap_or_else(|| "Refund processed through back office".to_string()),
        )
        .execute(&mut *tx)
        .await?;
    }

    if effect != StockEffect::None {
        dashboard::refresh(&mut tx).await?;
    }

    tx.commit().await?;

    tracing::info!(
        order = %updated.order_number,
        status = %updated.status,
        payment_status = %updated.payment_status,
        "order transitioned"
    );

    events
        .publish(&DomainEvent::OrderStatusChanged {
            order_id,
            order_number: updated.order_number.clone(),
            status: updated.status.clone(),
            payment_status: updated.payment_status.clone(),
        })
        .await;
    if stock_touched {
        let event = match effect {
            StockEffect::Commit => DomainEvent::StockCommitted { order_id },
            _ => DomainEvent::StockRestored { order_id },
        };
        events.publish(&event).await;
    }

    Ok(updated)
}
