//! Order history, admin order management, invoice download.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{page_bounds, ListParams, PaginatedResponse};
use crate::auth::{AuthSession, Role};
use crate::error::{ApiError, Result};
use crate::events::{self, StoreEvent};
use crate::models::{Order, OrderItem, OrderStatus, PAYMENT_STATUSES};
use crate::AppState;

pub async fn list_my_orders(
    State(s): State<AppState>,
    session: AuthSession,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Order>>> {
    let (page, limit, offset) = page_bounds(&p);
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(session.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(session.user_id)
        .fetch_one(&s.db)
        .await?;
    Ok(Json(PaginatedResponse {
        data: orders,
        total: total.0,
        page,
    }))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

pub async fn get_order(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    if order.user_id != session.user_id && session.role != Role::Admin {
        // hide existence from other users
        return Err(ApiError::NotFound("order"));
    }
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at",
    )
    .bind(order.id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(OrderDetail { order, items }))
}

pub async fn list_all_orders(
    State(s): State<AppState>,
    session: AuthSession,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Order>>> {
    session.require(Role::Admin)?;
    let (page, limit, offset) = page_bounds(&p);
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::text IS NULL OR status = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&p.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await?;
    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(&p.status)
            .fetch_one(&s.db)
            .await?;
    Ok(Json(PaginatedResponse {
        data: orders,
        total: total.0,
        page,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

pub async fn update_order_status(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>> {
    session.require(Role::Admin)?;
    if let Some(status) = &r.status {
        if OrderStatus::parse(status).is_none() {
            return Err(ApiError::Validation(format!("unknown status {status}")));
        }
    }
    if let Some(ps) = &r.payment_status {
        if !PAYMENT_STATUSES.contains(&ps.as_str()) {
            return Err(ApiError::Validation(format!("unknown payment status {ps}")));
        }
    }
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = COALESCE($2::text, status), \
         payment_status = COALESCE($3::text, payment_status), updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.status)
    .bind(&r.payment_status)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("order"))?;

    if r.status.is_some() {
        events::publish(
            &s.nats,
            StoreEvent::OrderStatusChanged {
                order_id: order.id,
                status: order.status.clone(),
            },
        )
        .await;
    }
    Ok(Json(order))
}

/// Serves a stored invoice. The URL is recorded on the order and treated as
/// public, matching the original object-store contract.
pub async fn download_invoice(
    State(s): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    // invoice names are flat; anything path-like is rejected
    if name.contains('/') || name.contains("..") || !name.ends_with(".html") {
        return Err(ApiError::NotFound("invoice"));
    }
    let path = s.invoice_dir.join(&name);
    let html = tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| ApiError::NotFound("invoice"))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    ))
}
