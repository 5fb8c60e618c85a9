//! Customer records. Minimal: enough identity to attach orders and
//! payment methods to.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::Customer;
use crate::{AppError, AppState, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    r.validate()?;
    let customer = sqlx::query_as::<_, Customer>(
        "INSERT INTO customers (id, email, name, is_staff, created_at) \
         VALUES ($1, $2, $3, FALSE, NOW()) \
         ON CONFLICT (email) DO UPDATE SET name = COALESCE(EXCLUDED.name, customers.name) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.email)
    .bind(&r.name)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_one(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("customer"))
}
