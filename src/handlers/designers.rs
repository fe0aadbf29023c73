//! Designer administration and the designer portal.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::auth::{AuthSession, Role};
use crate::error::{ApiError, Result};
use crate::models::{Designer, Product, FULFILLMENT_STATUSES};
use crate::AppState;

/// Portal access requires the designer role and an active designer record.
async fn designer_for(s: &AppState, session: &AuthSession) -> Result<Designer> {
    session.require(Role::Designer)?;
    sqlx::query_as::<_, Designer>("SELECT * FROM designers WHERE user_id = $1 AND is_active")
        .bind(session.user_id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::Forbidden)
}

// ---- admin ----

pub async fn list_designers(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<Designer>>> {
    session.require(Role::Admin)?;
    let designers =
        sqlx::query_as::<_, Designer>("SELECT * FROM designers ORDER BY created_at DESC")
            .fetch_all(&s.db)
            .await?;
    Ok(Json(designers))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDesignerRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub display_name: String,
    pub bio: Option<String>,
}

pub async fn create_designer(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<CreateDesignerRequest>,
) -> Result<(StatusCode, Json<Designer>)> {
    session.require(Role::Admin)?;
    check(&r)?;
    let designer = sqlx::query_as::<_, Designer>(
        "INSERT INTO designers (id, user_id, display_name, bio, is_active, created_at) \
         VALUES ($1, $2, $3, $4, TRUE, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(r.user_id)
    .bind(&r.display_name)
    .bind(&r.bio)
    .fetch_one(&s.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Validation("user already has a designer profile".into())
        }
        _ => ApiError::Database(e),
    })?;
    Ok((StatusCode::CREATED, Json(designer)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDesignerRequest {
    #[validate(length(min = 1, max = 120))]
    pub display_name: String,
    pub bio: Option<String>,
    pub is_active: bool,
}

pub async fn update_designer(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateDesignerRequest>,
) -> Result<Json<Designer>> {
    session.require(Role::Admin)?;
    check(&r)?;
    let designer = sqlx::query_as::<_, Designer>(
        "UPDATE designers SET display_name = $2, bio = $3, is_active = $4 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.display_name)
    .bind(&r.bio)
    .bind(r.is_active)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("designer"))?;
    Ok(Json(designer))
}

// ---- portal ----

pub async fn my_products(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<Product>>> {
    let designer = designer_for(&s, &session).await?;
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE designer_id = $1 AND status <> 'deleted' \
         ORDER BY created_at DESC",
    )
    .bind(designer.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(products))
}

/// Order line joined with just enough order context for fulfillment work.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DesignerOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub order_status: String,
    pub product_name: String,
    pub quantity: i32,
    pub total_price: i64,
    pub size: String,
    pub color: String,
    pub fulfillment_status: String,
}

pub async fn my_order_items(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<DesignerOrderItem>>> {
    let designer = designer_for(&s, &session).await?;
    let items = sqlx::query_as::<_, DesignerOrderItem>(
        "SELECT oi.id, oi.order_id, o.order_number, o.status AS order_status, \
         oi.product_name, oi.quantity, oi.total_price, oi.size, oi.color, oi.fulfillment_status \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         JOIN products p ON p.id = oi.product_id \
         WHERE p.designer_id = $1 AND o.status NOT IN ('cancelled', 'refunded') \
         ORDER BY o.created_at DESC",
    )
    .bind(designer.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct UpdateFulfillmentRequest {
    pub fulfillment_status: String,
}

pub async fn update_fulfillment(
    State(s): State<AppState>,
    session: AuthSession,
    Path(item_id): Path<Uuid>,
    Json(r): Json<UpdateFulfillmentRequest>,
) -> Result<StatusCode> {
    let designer = designer_for(&s, &session).await?;
    if !FULFILLMENT_STATUSES.contains(&r.fulfillment_status.as_str()) {
        return Err(ApiError::Validation(format!(
            "unknown fulfillment status {}",
            r.fulfillment_status
        )));
    }
    // ownership enforced in the WHERE clause
    let affected = sqlx::query(
        "UPDATE order_items oi SET fulfillment_status = $2 \
         FROM products p \
         WHERE oi.id = $1 AND p.id = oi.product_id AND p.designer_id = $3",
    )
    .bind(item_id)
    .bind(&r.fulfillment_status)
    .bind(designer.id)
    .execute(&s.db)
    .await?;
    if affected.rows_affected() == 0 {
        return Err(ApiError::NotFound("order item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductSales {
    pub product_name: String,
    pub units: i64,
    pub revenue: i64,
}

pub async fn my_sales_summary(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<ProductSales>>> {
    let designer = designer_for(&s, &session).await?;
    let rows = sqlx::query_as::<_, ProductSales>(
        "SELECT oi.product_name, COALESCE(SUM(oi.quantity), 0)::bigint AS units, \
         COALESCE(SUM(oi.total_price), 0)::bigint AS revenue \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         JOIN products p ON p.id = oi.product_id \
         WHERE p.designer_id = $1 AND o.status NOT IN ('cancelled', 'refunded') \
         GROUP BY oi.product_name ORDER BY revenue DESC",
    )
    .bind(designer.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(rows))
}
