//! Saved addresses; at most one default per user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::auth::AuthSession;
use crate::error::{ApiError, Result};
use crate::models::Address;
use crate::AppState;

pub async fn list_addresses(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<Address>>> {
    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
    )
    .bind(session.user_id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(addresses))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub city: String,
    #[validate(length(min = 1, max = 80))]
    pub state: String,
    #[validate(length(min = 4, max = 12))]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    "IN".into()
}

pub async fn create_address(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Address>)> {
    check(&r)?;
    let mut tx = s.db.begin().await?;
    if r.is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await?;
    }
    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses (id, user_id, full_name, phone, line1, line2, city, state, \
         postal_code, country, is_default, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(session.user_id)
    .bind(&r.full_name)
    .bind(&r.phone)
    .bind(&r.line1)
    .bind(&r.line2)
    .bind(&r.city)
    .bind(&r.state)
    .bind(&r.postal_code)
    .bind(&r.country)
    .bind(r.is_default)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn set_default_address(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Address>> {
    let mut tx = s.db.begin().await?;
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
        .bind(session.user_id)
        .execute(&mut *tx)
        .await?;
    let address = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET is_default = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(session.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("address"))?;
    tx.commit().await?;
    Ok(Json(address))
}

/// Why a guarded delete removed nothing: either the row is not the caller's,
/// or an order still points at it.
fn blocked_delete_error(owned_and_referenced: bool) -> ApiError {
    if owned_and_referenced {
        ApiError::Validation("address is used by an order".into())
    } else {
        ApiError::NotFound("address")
    }
}

pub async fn delete_address(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let affected = sqlx::query(
        "DELETE FROM addresses WHERE id = $1 AND user_id = $2 \
         AND NOT EXISTS (SELECT 1 FROM orders WHERE shipping_address_id = $1 OR billing_address_id = $1)",
    )
    .bind(id)
    .bind(session.user_id)
    .execute(&s.db)
    .await?;
    if affected.rows_affected() == 0 {
        let (referenced,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM addresses a \
             JOIN orders o ON o.shipping_address_id = a.id OR o.billing_address_id = a.id \
             WHERE a.id = $1 AND a.user_id = $2)",
        )
        .bind(id)
        .bind(session.user_id)
        .fetch_one(&s.db)
        .await?;
        return Err(blocked_delete_error(referenced));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_address_reports_the_conflict_not_absence() {
        assert!(matches!(
            blocked_delete_error(true),
            ApiError::Validation(ref m) if m == "address is used by an order"
        ));
        assert!(matches!(
            blocked_delete_error(false),
            ApiError::NotFound("address")
        ));
    }
}
