//! Catalog endpoints: products, variants, categories.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ListParams, PaginatedResponse};
use crate::domain::aggregates::product::average_rating;
use crate::domain::value_objects::Sku;
use crate::models::{Brand, Category, Product, ProductReview, ProductVariant};
use crate::{AppError, AppState, Result};

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>> {
    let status = p.status.clone().unwrap_or_else(|| "active".to_string());
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = $1 \
         AND ($2::uuid IS NULL OR category_id = $2) \
         AND ($3::uuid IS NULL OR brand_id = $3) \
         AND ($4::text IS NULL OR name ILIKE '%' || $4 || '%' OR sku ILIKE '%' || $4 || '%') \
         ORDER BY created_at DESC LIMIT $5 OFFSET $6",
    )
    .bind(&status)
    .bind(p.category)
    .bind(p.brand)
    .bind(p.search.as_deref())
    .bind(i64::from(p.per_page()))
    .bind(p.offset())
    .fetch_all(&s.db)
    .await?;
    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE status = $1 \
         AND ($2::uuid IS NULL OR category_id = $2) \
         AND ($3::uuid IS NULL OR brand_id = $3) \
         AND ($4::text IS NULL OR name ILIKE '%' || $4 || '%' OR sku ILIKE '%' || $4 || '%')",
    )
    .bind(&status)
    .bind(p.category)
    .bind(p.brand)
    .bind(p.search.as_deref())
    .fetch_one(&s.db)
    .await?;
    Ok(Json(PaginatedResponse {
        data: products,
        total,
        page: p.page(),
    }))
}

pub async fn get_one(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND status <> 'deleted'")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("product"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    let sku = Sku::generate();
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, sku, name, description, price, currency, category_id, brand_id, stock, status, images, tags, metadata, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'active', $10, $11, '{}'::jsonb, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(sku.as_str())
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(&s.config.currency)
    .bind(r.category_id)
    .bind(r.brand_id)
    .bind(r.stock.unwrap_or(0))
    .bind(r.images.unwrap_or_default())
    .bind(r.tags.unwrap_or_default())
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub status: Option<String>,
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    r.validate()?;
    if let Some(status) = &r.status {
        status.parse::<crate::domain::aggregates::ProductStatus>()?;
    }
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, category_id = $5, \
         brand_id = $6, stock = COALESCE($7, stock), status = COALESCE($8, status), updated_at = NOW() \
         WHERE id = $1 AND status <> 'deleted' RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(r.category_id)
    .bind(r.brand_id)
    .bind(r.stock)
    .bind(r.status.as_deref())
    .fetch_optional(&s.db)
    .await?
    .ok_or(AppError::NotFound("product"))?;
    Ok(Json(product))
}

pub async fn remove(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let updated = sqlx::query("UPDATE products SET status = 'deleted', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("product"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_variants(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProductVariant>>> {
    let variants = sqlx::query_as::<_, ProductVariant>(
        "SELECT * FROM product_variants WHERE product_id = $1 AND is_active ORDER BY created_at",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(variants))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVariantRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub sku: Option<String>,
    pub price_adjustment: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
}

pub async fn create_variant(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<CreateVariantRequest>,
) -> Result<(StatusCode, Json<ProductVariant>)> {
    r.validate()?;
    let exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND status <> 'deleted'")
            .bind(id)
            .fetch_optional(&s.db)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("product"));
    }
    let sku = match r.sku {
        Some(sku) => Sku::new(sku)
            .map_err(|e| AppError::Validation(e.to_string()))?
            .to_string(),
        None => Sku::generate().to_string(),
    };
    let variant = sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants (id, product_id, name, sku, price_adjustment, stock, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, TRUE, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(id)
    .bind(&r.name)
    .bind(&sku)
    .bind(r.price_adjustment.unwrap_or(0))
    .bind(r.stock.unwrap_or(0))
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn list_brands(State(s): State<AppState>) -> Result<Json<Vec<Brand>>> {
    let brands =
        sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE is_active ORDER BY name")
            .fetch_all(&s.db)
            .await?;
    Ok(Json(brands))
}

pub async fn get_brand(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Brand>> {
    sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("brand"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBrandRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
}

pub async fn create_brand(
    State(s): State<AppState>,
    Json(r): Json<CreateBrandRequest>,
) -> Result<(StatusCode, Json<Brand>)> {
    r.validate()?;
    let slug = r.name.to_lowercase().replace(' ', "-");
    let brand = sqlx::query_as::<_, Brand>(
        "INSERT INTO brands (id, name, slug, description, website, is_active, created_at) \
         VALUES ($1, $2, $3, $4, $5, TRUE, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&slug)
    .bind(&r.description)
    .bind(r.website.as_deref())
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub data: Vec<ProductReview>,
    pub average_rating: Option<f64>,
    pub count: usize,
}

/// Approved reviews for a product, newest first, with the mean rating.
pub async fn list_reviews(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewList>> {
    let reviews = sqlx::query_as::<_, ProductReview>(
        "SELECT * FROM product_reviews WHERE product_id = $1 AND is_approved \
         ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await?;
    let ratings: Vec<i32> = reviews.iter().map(|r| r.rating).collect();
    Ok(Json(ReviewList {
        average_rating: average_rating(&ratings),
        count: reviews.len(),
        data: reviews,
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub customer_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub comment: String,
}

/// Submit a review. One per customer per product; held for moderation.
pub async fn create_review(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ProductReview>)> {
    r.validate()?;
    let exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND status <> 'deleted'")
            .bind(id)
            .fetch_optional(&s.db)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("product"));
    }

    let (verified,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         WHERE o.customer_id = $1 AND oi.product_id = $2 AND o.status = 'delivered')",
    )
    .bind(r.customer_id)
    .bind(id)
    .fetch_one(&s.db)
    .await?;

    let duplicate: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM product_reviews WHERE product_id = $1 AND customer_id = $2",
    )
    .bind(id)
    .bind(r.customer_id)
    .fetch_optional(&s.db)
    .await?;
    if duplicate.is_some() {
        return Err(AppError::BadRequest(
            "customer has already reviewed this product".into(),
        ));
    }

    let review = sqlx::query_as::<_, ProductReview>(
        "INSERT INTO product_reviews (id, product_id, customer_id, rating, title, comment, \
         is_verified_purchase, is_approved, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(id)
    .bind(r.customer_id)
    .bind(r.rating)
    .bind(&r.title)
    .bind(&r.comment)
    .bind(verified)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("category"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

pub async fn create_category(
    State(s): State<AppState>,
    Json(r): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    r.validate()?;
    let slug = r.name.to_lowercase().replace(' ', "-");
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, description, parent_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&slug)
    .bind(&r.description)
    .bind(r.parent_id)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}
