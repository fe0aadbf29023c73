//! Coupon administration and cart-side validation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{cart_subtotal_for, check};
use crate::auth::{AuthSession, Role};
use crate::error::{ApiError, CouponError, Result};
use crate::models::Coupon;
use crate::pricing::{normalize_code, validate_coupon, AppliedCoupon};
use crate::AppState;

pub(crate) async fn fetch_coupon(s: &AppState, raw_code: &str) -> Result<Coupon> {
    let code = normalize_code(raw_code);
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupon_codes WHERE code = $1")
        .bind(&code)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::Coupon(CouponError::NotFound))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateCouponResponse {
    pub coupon: AppliedCoupon,
    pub subtotal: i64,
}

/// Validates against the caller's live cart. No side effects; redemption
/// happens inside checkout.
pub async fn validate(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<ValidateCouponRequest>,
) -> Result<Json<ValidateCouponResponse>> {
    check(&r)?;
    let subtotal = cart_subtotal_for(&s, session.user_id).await?;
    let coupon = fetch_coupon(&s, &r.code).await?;
    let applied = validate_coupon(&coupon, subtotal, Utc::now())?;
    Ok(Json(ValidateCouponResponse {
        coupon: applied,
        subtotal,
    }))
}

pub async fn list_coupons(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<Coupon>>> {
    session.require(Role::Admin)?;
    let coupons =
        sqlx::query_as::<_, Coupon>("SELECT * FROM coupon_codes ORDER BY created_at DESC")
            .fetch_all(&s.db)
            .await?;
    Ok(Json(coupons))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    #[validate(range(min = 1))]
    pub discount_amount: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub min_order_amount: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub max_uses: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

pub async fn create_coupon(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<CouponRequest>,
) -> Result<(StatusCode, Json<Coupon>)> {
    session.require(Role::Admin)?;
    check(&r)?;
    if r.valid_until <= r.valid_from {
        return Err(ApiError::Validation("validity window is empty".into()));
    }
    let coupon = sqlx::query_as::<_, Coupon>(
        "INSERT INTO coupon_codes (id, code, discount_amount, min_order_amount, valid_from, \
         valid_until, max_uses, current_uses, is_active, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(normalize_code(&r.code))
    .bind(r.discount_amount)
    .bind(r.min_order_amount)
    .bind(r.valid_from)
    .bind(r.valid_until)
    .bind(r.max_uses)
    .bind(r.is_active)
    .fetch_one(&s.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Validation("coupon code already exists".into())
        }
        _ => ApiError::Database(e),
    })?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// A new cap must leave room for redemptions already recorded, or the update
/// would violate the usage invariant.
fn max_uses_accommodates(max_uses: Option<i32>, current_uses: i32) -> bool {
    max_uses.map_or(true, |max| max >= current_uses)
}

pub async fn update_coupon(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
    Json(r): Json<CouponRequest>,
) -> Result<Json<Coupon>> {
    session.require(Role::Admin)?;
    check(&r)?;
    if r.valid_until <= r.valid_from {
        return Err(ApiError::Validation("validity window is empty".into()));
    }
    let existing = sqlx::query_as::<_, Coupon>("SELECT * FROM coupon_codes WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .ok_or(ApiError::NotFound("coupon"))?;
    if !max_uses_accommodates(r.max_uses, existing.current_uses) {
        return Err(ApiError::Validation(format!(
            "max_uses below the {} redemptions already recorded",
            existing.current_uses
        )));
    }
    let coupon = sqlx::query_as::<_, Coupon>(
        "UPDATE coupon_codes SET code = $2, discount_amount = $3, min_order_amount = $4, \
         valid_from = $5, valid_until = $6, max_uses = $7, is_active = $8 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(normalize_code(&r.code))
    .bind(r.discount_amount)
    .bind(r.min_order_amount)
    .bind(r.valid_from)
    .bind(r.valid_until)
    .bind(r.max_uses)
    .bind(r.is_active)
    .fetch_optional(&s.db)
    .await?
    .ok_or(ApiError::NotFound("coupon"))?;
    Ok(Json(coupon))
}

pub async fn delete_coupon(
    State(s): State<AppState>,
    session: AuthSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    session.require(Role::Admin)?;
    // deactivate rather than drop; redeemed orders reference the code
    sqlx::query("UPDATE coupon_codes SET is_active = FALSE WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowering_max_uses_below_redemptions_is_rejected() {
        assert!(!max_uses_accommodates(Some(5), 10));
        assert!(!max_uses_accommodates(Some(9), 10));
    }

    #[test]
    fn max_uses_at_or_above_redemptions_is_accepted() {
        assert!(max_uses_accommodates(Some(10), 10));
        assert!(max_uses_accommodates(Some(100), 10));
        // unlimited always accommodates
        assert!(max_uses_accommodates(None, 10));
    }
}
