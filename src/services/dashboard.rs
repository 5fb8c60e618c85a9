//! Dashboard metrics rollup.
//!
//! Recomputes aggregate metrics from the order, product, and customer
//! tables and upserts them into the singleton `dashboard` row. Revenue
//! counts orders that are delivered and paid; the rollup runs eagerly on
//! qualifying order transitions and on back-office dashboard loads.

use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::models::{DailySale, Dashboard};
use crate::Result;

const SETTLED: &str = "status = 'delivered' AND payment_status = 'paid'";

pub async fn refresh(conn: &mut PgConnection) -> Result<Dashboard> {
    let (total_orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&mut *conn)
        .await?;
    let (total_revenue,): (i64,) = sqlx::query_as(&format!(
        "SELECT COALESCE(SUM(total), 0)::BIGINT FROM orders WHERE {SETTLED}"
    ))
    .fetch_one(&mut *conn)
    .await?;
    let (total_products,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE status <> 'deleted'")
            .fetch_one(&mut *conn)
            .await?;
    let (total_customers,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM customers WHERE NOT is_staff")
            .fetch_one(&mut *conn)
            .await?;

    let monthly: Vec<(i32, i64)> = sqlx::query_as(&format!(
        "SELECT EXTRACT(MONTH FROM created_at)::INT4, COALESCE(SUM(total), 0)::BIGINT \
         FROM orders WHERE {SETTLED} AND created_at >= date_trunc('year', NOW()) \
         GROUP BY 1",
    ))
    .fetch_all(&mut *conn)
    .await?;

    let dashboard: Dashboard = sqlx::query_as(
        "INSERT INTO dashboard (id, total_orders, total_revenue, total_products, total_customers, monthly_revenue, last_updated) \
         VALUES (1, $1, $2, $3, $4, $5, NOW()) \
         ON CONFLICT (id) DO UPDATE SET \
           total_orders = EXCLUDED.total_orders, \
           total_revenue = EXCLUDED.total_revenue, \
           total_products = EXCLUDED.total_products, \
           total_customers = EXCLUDED.total_customers, \
           monthly_revenue = EXCLUDED.monthly_revenue, \
           last_updated = NOW() \
         RETURNING *",
    )
    .bind(total_orders)
    .bind(total_revenue)
    .bind(total_products)
    .bind(total_customers)
    .bind(fold_monthly(&monthly))
    .fetch_one(&mut *conn)
    .await?;

    Ok(dashboard)
}

/// Settled revenue per day for the trailing week, oldest day first.
pub async fn daily_sales(conn: &mut PgConnection) -> Result<Vec<DailySale>> {
    let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(&format!(
        "SELECT created_at::DATE, COALESCE(SUM(total), 0)::BIGINT \
         FROM orders WHERE {SETTLED} AND created_at >= NOW() - INTERVAL '7 days' \
         GROUP BY 1",
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(fold_daily(chrono::Utc::now().date_naive(), &rows))
}

/// Month-keyed revenue map with every month of the year present.
pub fn fold_monthly(rows: &[(i32, i64)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for month in 1..=12 {
        let total = rows
            .iter()
            .find(|(m, _)| *m == month)
            .map(|(_, t)| *t)
            .unwrap_or(0);
        map.insert(month.to_string(), total.into());
    }
    serde_json::Value::Object(map)
}

/// Seven consecutive day buckets ending at `today`, zero-filled.
pub fn fold_daily(today: NaiveDate, rows: &[(NaiveDate, i64)]) -> Vec<DailySale> {
    (0..7)
        .rev()
        .map(|back| {
            let day = today - chrono::Duration::days(back);
            let total = rows
                .iter()
                .find(|(d, _)| *d == day)
                .map(|(_, t)| *t)
                .unwrap_or(0);
            DailySale { day, total }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_monthly_fills_gaps() {
        let folded = fold_monthly(&[(1, 5_000), (3, 2_500)]);
        let map = folded.as_object().unwrap();
        assert_eq!(map.len(), 12);
        assert_eq!(map["1"], 5_000);
        assert_eq!(map["2"], 0);
        assert_eq!(map["3"], 2_500);
        assert_eq!(map["12"], 0);
    }

    #[test]
    fn test_fold_daily_window() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let rows = vec![
            (NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(), 1_000),
            (NaiveDate::from_ymd_opt(2026, 8, 22).unwrap(), 400),
            // Outside the window, must be ignored.
            (NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(), 9_999),
        ];
        let daily = fold_daily(today, &rows);
        assert_eq!(daily.len(), 7);
        assert_eq!(daily[0].day, NaiveDate::from_ymd_opt(2026, 8, 20).unwrap());
        assert_eq!(daily[0].total, 0);
        assert_eq!(daily[2].total, 400);
        assert_eq!(daily[6].day, today);
        assert_eq!(daily[6].total, 1_000);
    }

    #[test]
    fn test_fold_daily_sums_to_week_total() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let rows: Vec<(NaiveDate, i64)> = (0..7)
            .map(|i| (today - chrono::Duration::days(i), 100))
            .collect();
        let total: i64 = fold_daily(today, &rows).iter().map(|d| d.total).sum();
        assert_eq!(total, 700);
    }
}
