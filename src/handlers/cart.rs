//! Cart and wishlist. Cart lines merge on (product, size, color).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::auth::AuthSession;
use crate::error::{ApiError, Result};
use crate::models::{CartItem, Product, WishlistItem};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub subtotal: i64,
}

pub(crate) async fn load_cart(s: &AppState, user_id: Uuid) -> Result<Vec<CartItem>> {
    let items = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(&s.db)
    .await?;
    Ok(items)
}

pub(crate) fn cart_subtotal(items: &[CartItem]) -> i64 {
    items.iter().map(CartItem::line_total).sum()
}

pub async fn get_cart(State(s): State<AppState>, session: AuthSession) -> Result<Json<CartResponse>> {
    let items = load_cart(&s, session.user_id).await?;
    let subtotal = cart_subtotal(&items);
    Ok(Json(CartResponse { items, subtotal }))
}

/// Line quantity cap; repeat adds merge but never exceed it.
pub(crate) const MAX_LINE_QUANTITY: i32 = 99;

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 99))]
    pub quantity: i32,
    pub size: Option<String>,
    pub color: Option<String>,
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    check(&r)?;
    // snapshot name/price at add time
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND status = 'active'",
    )
    .bind(r.product_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("product"))?;

    let size = r.size.unwrap_or_default();
    let color = r.color.unwrap_or_default();
    if !size.is_empty() && !product.sizes.contains(&size) {
        return Err(ApiError::Validation(format!("size {size} not offered")));
    }
    if !color.is_empty() && !product.colors.contains(&color) {
        return Err(ApiError::Validation(format!("color {color} not offered")));
    }

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (id, user_id, product_id, product_name, unit_price, image_url, \
         quantity, size, color, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW()) \
         ON CONFLICT (user_id, product_id, size, color) \
         DO UPDATE SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $10) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(session.user_id)
    .bind(product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.images.first())
    .bind(r.quantity)
    .bind(&size)
    .bind(&color)
    .bind(MAX_LINE_QUANTITY)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 0, max = 99))]
    pub quantity: i32,
}

/// Quantity 0 removes the line.
pub async fn update_cart_item(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Result<StatusCode> {
    check(&r)?;
    let affected = if r.quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(session.user_id)
            .execute(&s.db)
            .await?
    } else {
        sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(session.user_id)
            .bind(r.quantity)
            .execute(&s.db)
            .await?
    };
    if affected.rows_affected() == 0 {
        return Err(ApiError::NotFound("cart item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_cart_item(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let affected = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(session.user_id)
        .execute(&s.db)
        .await?;
    if affected.rows_affected() == 0 {
        return Err(ApiError::NotFound("cart item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_cart(State(s): State<AppState>, session: AuthSession) -> Result<StatusCode> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(session.user_id)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_wishlist(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<Product>>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT p.* FROM products p \
         JOIN wishlist_items w ON w.product_id = p.id \
         WHERE w.user_id = $1 AND p.status = 'active' ORDER BY w.created_at DESC",
    )
    .bind(session.user_id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(products))
}

#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    pub product_id: Uuid,
}

pub async fn add_to_wishlist(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<WishlistRequest>,
) -> Result<(StatusCode, Json<WishlistItem>)> {
    let item = sqlx::query_as::<_, WishlistItem>(
        "INSERT INTO wishlist_items (id, user_id, product_id, created_at) \
         VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET product_id = EXCLUDED.product_id \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(session.user_id)
    .bind(r.product_id)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn remove_from_wishlist(
    State(s): State<AppState>,
    session: AuthSession,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode> {
    sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(session.user_id)
        .bind(product_id)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_request(quantity: i32) -> AddToCartRequest {
        AddToCartRequest {
            product_id: Uuid::new_v4(),
            quantity,
            size: None,
            color: None,
        }
    }

    #[test]
    fn line_quantity_cap_holds_per_request_and_in_merge() {
        // the upsert clamps merged lines with LEAST(..., MAX_LINE_QUANTITY);
        // the per-request validator bound must agree with it
        assert!(check(&add_request(MAX_LINE_QUANTITY)).is_ok());
        assert!(check(&add_request(MAX_LINE_QUANTITY + 1)).is_err());
        assert!(check(&add_request(0)).is_err());
    }
}
