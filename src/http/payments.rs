//! Payment-method storage and provider webhook ingestion.
//!
//! The payment provider itself is opaque: this service never calls out to
//! it. Customers save tokenized payment methods, and the provider reports
//! payment outcomes through a signed webhook.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::order::{OrderStatus, PaymentStatus};
use crate::domain::events::DomainEvent;
use crate::models::{Order, PaymentMethod};
use crate::services::orders::{apply_status_change, StatusChange};
use crate::services::webhook::verify_signature;
use crate::{AppError, AppState, Result};

const SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn list_methods(
    State(s): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentMethod>>> {
    let methods = sqlx::query_as::<_, PaymentMethod>(
        "SELECT * FROM payment_methods WHERE customer_id = $1 AND is_active \
         ORDER BY is_default DESC, created_at DESC",
    )
    .bind(customer_id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(methods))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentMethodRequest {
    pub method_type: String,
    pub provider: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub token: String,
    pub card_last4: Option<String>,
    pub card_brand: Option<String>,
    pub card_exp_month: Option<i32>,
    pub card_exp_year: Option<i32>,
}

pub async fn create_method(
    State(s): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(r): Json<CreatePaymentMethodRequest>,
) -> Result<(StatusCode, Json<PaymentMethod>)> {
    r.validate()?;
    if !matches!(r.method_type.as_str(), "card" | "bank" | "wallet") {
        return Err(AppError::Validation(format!(
            "unknown payment method type: {}",
            r.method_type
        )));
    }

    let duplicate: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM payment_methods WHERE customer_id = $1 AND token = $2")
            .bind(customer_id)
            .bind(&r.token)
            .fetch_optional(&s.db)
            .await?;
    if duplicate.is_some() {
        return Err(AppError::BadRequest("payment method already saved".into()));
    }

    // The first saved method becomes the default.
    let (has_methods,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM payment_methods WHERE customer_id = $1 AND is_active)",
    )
    .bind(customer_id)
    .fetch_one(&s.db)
    .await?;

    let method = sqlx::query_as::<_, PaymentMethod>(
        "INSERT INTO payment_methods (id, customer_id, method_type, provider, token, is_default, is_active, \
         card_last4, card_brand, card_exp_month, card_exp_year, metadata, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9, $10, '{}'::jsonb, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(customer_id)
    .bind(&r.method_type)
    .bind(r.provider.as_deref().unwrap_or("stripe"))
    .bind(&r.token)
    .bind(!has_methods)
    .bind(r.card_last4.as_deref())
    .bind(r.card_brand.as_deref())
    .bind(r.card_exp_month)
    .bind(r.card_exp_year)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(method)))
}

pub async fn remove_method(
    State(s): State<AppState>,
    Path((customer_id, pm_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    let deleted =
        sqlx::query("DELETE FROM payment_methods WHERE id = $1 AND customer_id = $2")
            .bind(pm_id)
            .bind(customer_id)
            .execute(&s.db)
            .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("payment method"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_default_method(
    State(s): State<AppState>,
    Path((customer_id, pm_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PaymentMethod>> {
    let mut tx = s.db.begin().await?;
    sqlx::query("UPDATE payment_methods SET is_default = FALSE, updated_at = NOW() WHERE customer_id = $1")
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;
    let method = sqlx::query_as::<_, PaymentMethod>(
        "UPDATE payment_methods SET is_default = TRUE, updated_at = NOW() \
         WHERE id = $1 AND customer_id = $2 AND is_active RETURNING *",
    )
    .bind(pm_id)
    .bind(customer_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("payment method"))?;
    tx.commit().await?;
    Ok(Json(method))
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: PaymentIntent,
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
    id: String,
    #[serde(default)]
    amount: i64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
    #[serde(default)]
    last_payment_error: Option<serde_json::Value>,
}

/// Provider webhook endpoint.
///
/// Verifies the HMAC signature over the raw body before parsing. Known
/// events update the order's payment status through the shared transition
/// handler; retried deliveries are absorbed by the unique transaction id.
pub async fn webhook(
    State(s): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let Some(secret) = s.config.webhook_secret.as_deref() else {
        tracing::warn!("webhook received but WEBHOOK_SECRET is not configured");
        return Err(AppError::InvalidSignature);
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;
    verify_signature(&body, signature, secret, chrono::Utc::now().timestamp())?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed webhook payload: {e}")))?;
    let intent = &event.data.object;

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let order = find_order(&s, intent).await?;
            if record_transaction(&s, &order, intent, "completed", None).await? {
                let new_status =
                    (order.status == "pending").then_some(OrderStatus::Processing);
                apply_status_change(
                    &s.db,
                    &s.events,
                    order.id,
                    StatusChange {
                        status: new_status,
                        payment_status: Some(PaymentStatus::Paid),
                        notes: Some(format!("Payment {} succeeded", intent.id)),
                        changed_by: Some("payment-webhook".to_string()),
                    },
                )
                .await?;
                s.events
                    .publish(&DomainEvent::PaymentRecorded {
                        order_id: order.id,
                        transaction_id: intent.id.clone(),
                        amount: intent.amount,
                        currency: intent.currency.clone().unwrap_or_else(|| order.currency.clone()),
                    })
                    .await;
            }
        }
        "payment_intent.payment_failed" => {
            let order = find_order(&s, intent).await?;
            let error = intent
                .last_payment_error
                .as_ref()
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string);
            if record_transaction(&s, &order, intent, "failed", error).await? {
                apply_status_change(
                    &s.db,
                    &s.events,
                    order.id,
                    StatusChange {
                        payment_status: Some(PaymentStatus::Failed),
                        notes: Some(format!("Payment {} failed", intent.id)),
                        changed_by: Some("payment-webhook".to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            }
        }
        other => {
            tracing::debug!(event_type = other, "ignoring webhook event");
        }
    }

    Ok(Json(serde_json::json!({"received": true})))
}

async fn find_order(s: &AppState, intent: &PaymentIntent) -> Result<Order> {
    let order_id = intent
        .metadata
        .get("order_id")
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse::<Uuid>().ok());
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 OR transaction_id = $2 LIMIT 1",
    )
    .bind(order_id.unwrap_or(Uuid::nil()))
    .bind(&intent.id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("order"))
}

/// Insert the provider transaction; returns false when this intent was
/// already recorded (a webhook retry).
async fn record_transaction(
    s: &AppState,
    order: &Order,
    intent: &PaymentIntent,
    status: &str,
    error_message: Option<String>,
) -> Result<bool> {
    let payment_method_id: Option<(Uuid,)> = match &intent.payment_method {
        Some(token) => {
            sqlx::query_as("SELECT id FROM payment_methods WHERE token = $1")
                .bind(token)
                .fetch_optional(&s.db)
                .await?
        }
        None => None,
    };

    let inserted = sqlx::query(
        "INSERT INTO transactions (id, order_id, payment_method_id, transaction_id, amount, currency, \
         status, kind, provider, provider_transaction_id, provider_status, provider_response, \
         error_message, created_at, completed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'payment', 'stripe', $4, $8, $9, $10, NOW(), \
                 CASE WHEN $7 = 'completed' THEN NOW() END) \
         ON CONFLICT (transaction_id) DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(order.id)
    .bind(payment_method_id.map(|(id,)| id))
    .bind(&intent.id)
    .bind(intent.amount)
    .bind(intent.currency.as_deref().unwrap_or(&order.currency))
    .bind(status)
    .bind(intent.status.as_deref())
    .bind(if intent.metadata.is_null() {
        serde_json::json!({})
    } else {
        intent.metadata.clone()
    })
    .bind(error_message.as_deref())
    .execute(&s.db)
    .await?;

    if inserted.rows_affected() == 0 {
        tracing::info!(transaction = %intent.id, "webhook retry ignored");
        return Ok(false);
    }

    sqlx::query("UPDATE orders SET transaction_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(order.id)
        .bind(&intent.id)
        .execute(&s.db)
        .await?;
    Ok(true)
}
