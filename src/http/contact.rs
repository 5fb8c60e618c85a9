//! Contact form endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::ContactMessage;
use crate::{AppState, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

pub async fn submit(
    State(s): State<AppState>,
    Json(r): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactMessage>)> {
    r.validate()?;
    let message = sqlx::query_as::<_, ContactMessage>(
        "INSERT INTO contact_messages (id, name, email, subject, message, is_read, created_at) \
         VALUES ($1, $2, $3, $4, $5, FALSE, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&r.email)
    .bind(&r.subject)
    .bind(&r.message)
    .fetch_one(&s.db)
    .await?;
    tracing::info!(from = %message.email, "contact message received");
    Ok((StatusCode::CREATED, Json(message)))
}
