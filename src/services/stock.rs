//! Ledgered stock adjustments.
//!
//! Every inventory mutation on behalf of an order is recorded in the
//! `stock_movements` table. A commit is applied at most once per order
//! (guarded by the presence of `commit` rows), and a restore gives back
//! exactly the quantities the commit rows recorded. Callers run these
//! inside the transaction that also updates the order row, so an
//! insufficient-stock failure rolls the whole status change back.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::StockMovement;
use crate::{AppError, Result};

/// Decrement product (and variant) stock for each item of the order.
///
/// Returns `false` if the order already has commit rows, in which case
/// nothing is touched. The decrement is a guarded atomic update; a row
/// with insufficient stock fails the call.
pub async fn commit_for_order(conn: &mut PgConnection, order_id: Uuid) -> Result<bool> {
    let (already,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM stock_movements WHERE order_id = $1 AND kind = 'commit')",
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await?;
    if already {
        return Ok(false);
    }

    let items: Vec<(Uuid, Option<Uuid>, i32, String)> = sqlx::query_as(
        "SELECT product_id, variant_id, quantity, sku FROM order_items \
         WHERE order_id = $1 AND product_id IS NOT NULL",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    for (product_id, variant_id, quantity, sku) in &items {
        let updated = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
        if updated.rows_affected() == 0 {
            let available: Option<(i32,)> =
                sqlx::query_as("SELECT stock FROM products WHERE id = $1")
                    .bind(product_id)
                    .fetch_optional(&mut *conn)
                    .await?;
            return Err(AppError::InsufficientStock {
                sku: sku.clone(),
                available: available.map(|(s,)| s).unwrap_or(0),
                requested: *quantity,
            });
        }

        if let Some(variant_id) = variant_id {
            let updated = sqlx::query(
                "UPDATE product_variants SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(variant_id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;
            if updated.rows_affected() == 0 {
                let available: Option<(i32,)> =
                    sqlx::query_as("SELECT stock FROM product_variants WHERE id = $1")
                        .bind(variant_id)
                        .fetch_optional(&mut *conn)
                        .await?;
                return Err(AppError::InsufficientStock {
                    sku: sku.clone(),
                    available: available.map(|(s,)| s).unwrap_or(0),
                    requested: *quantity,
                });
            }
        }

        sqlx::query(
            "INSERT INTO stock_movements (id, order_id, product_id, variant_id, quantity, kind, created_at) \
             VALUES ($1, $2, $3, $4, $5, 'commit', NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(!items.is_empty())
}

/// Give back whatever the commit ledger recorded for the order.
///
/// Returns `false` if there is nothing to restore: either the order never
/// committed stock (it was cancelled before delivery) or a restore was
/// already applied.
pub async fn restore_for_order(conn: &mut PgConnection, order_id: Uuid) -> Result<bool> {
    let (already,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM stock_movements WHERE order_id = $1 AND kind = 'restore')",
    )
    .bind(order_id)
    .fetch_one(&mut *conn)
    .await?;
    if already {
        return Ok(false);
    }

    let committed: Vec<StockMovement> = sqlx::query_as(
        "SELECT * FROM stock_movements WHERE order_id = $1 AND kind = 'commit'",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    if committed.is_empty() {
        return Ok(false);
    }

    for movement in &committed {
        sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(movement.product_id)
            .bind(movement.quantity)
            .execute(&mut *conn)
            .await?;

        if let Some(variant_id) = movement.variant_id {
            sqlx::query(
                "UPDATE product_variants SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(variant_id)
            .bind(movement.quantity)
            .execute(&mut *conn)
            .await?;
        }

        sqlx::query(
            "INSERT INTO stock_movements (id, order_id, product_id, variant_id, quantity, kind, created_at) \
             VALUES ($1, $2, $3, $4, $5, 'restore', NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(movement.product_id)
        .bind(movement.variant_id)
        .bind(movement.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(true)
}
