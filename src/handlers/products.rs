//! Product catalog: public browsing, admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{check, page_bounds, ListParams, PaginatedResponse};
use crate::auth::{AuthSession, Role};
use crate::error::{ApiError, Result};
use crate::models::Product;
use crate::AppState;

pub async fn list_products(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>> {
    let (page, limit, offset) = page_bounds(&p);
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE status = 'active' \
         AND ($1::text IS NULL OR category = $1) \
         AND ($2::uuid IS NULL OR designer_id = $2) \
         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%') \
         ORDER BY created_at DESC LIMIT $4 OFFSET $5",
    )
    .bind(&p.category)
    .bind(p.designer)
    .bind(&p.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE status = 'active' \
         AND ($1::text IS NULL OR category = $1) \
         AND ($2::uuid IS NULL OR designer_id = $2) \
         AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')",
    )
    .bind(&p.category)
    .bind(p.designer)
    .bind(&p.search)
    .fetch_one(&s.db)
    .await?;
    Ok(Json(PaginatedResponse {
        data: products,
        total: total.0,
        page,
    }))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND status <> 'deleted'")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("product"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price: i64,
    pub category: Option<String>,
    pub designer_id: Option<Uuid>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

pub async fn create_product(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    session.require(Role::Admin)?;
    check(&r)?;
    let p = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, price, currency, category, designer_id, \
         sizes, colors, images, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, 'INR', $5, $6, $7, $8, $9, 'active', NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(&r.category)
    .bind(r.designer_id)
    .bind(&r.sizes)
    .bind(&r.colors)
    .bind(&r.images)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(p)))
}

pub async fn update_product(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(r): Json<ProductRequest>,
) -> Result<Json<Product>> {
    session.require(Role::Admin)?;
    check(&r)?;
    let p = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, price = $4, category = $5, \
         designer_id = $6, sizes = $7, colors = $8, images = $9, updated_at = NOW() \
         WHERE id = $1 AND status <> 'deleted' RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.price)
    .bind(&r.category)
    .bind(r.designer_id)
    .bind(&r.sizes)
    .bind(&r.colors)
    .bind(&r.images)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("product"))?;
    Ok(Json(p))
}

/// Soft delete; order-item snapshots keep history intact.
pub async fn delete_product(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    session.require(Role::Admin)?;
    sqlx::query("UPDATE products SET status = 'deleted', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
