//! Checkout: reactive quote and order confirmation.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::cart::{cart_subtotal, load_cart};
use super::coupons::fetch_coupon;
use super::check;
use crate::assembler::{place_order, OrderDraft, ShippingDetails};
use crate::auth::AuthSession;
use crate::error::{ApiError, Result};
use crate::models::{CartItem, Order, OrderItem, UserOrderStats};
use crate::pricing::{
    first_order_discount, first_order_eligible, validate_coupon, AppliedCoupon, PriceBreakdown,
};
use crate::AppState;

/// An empty cart never reaches pricing or assembly; the storefront shows its
/// empty-cart state off this rejection.
fn require_non_empty(items: &[CartItem]) -> Result<()> {
    if items.is_empty() {
        return Err(ApiError::Validation("cart is empty".into()));
    }
    Ok(())
}

async fn order_stats(s: &AppState, user_id: Uuid) -> Result<Option<UserOrderStats>> {
    let stats = sqlx::query_as::<_, UserOrderStats>(
        "SELECT * FROM user_order_stats WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&s.db)
    .await?;
    Ok(stats)
}

async fn applied_coupon(
    s: &AppState,
    code: Option<&str>,
    subtotal: i64,
) -> Result<Option<AppliedCoupon>> {
    match code {
        Some(code) if !code.trim().is_empty() => {
            let coupon = fetch_coupon(s, code).await?;
            Ok(Some(validate_coupon(&coupon, subtotal, Utc::now())?))
        }
        _ => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub coupon: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub totals: PriceBreakdown,
    pub coupon: Option<AppliedCoupon>,
    pub first_order_eligible: bool,
}

/// Recomputed by the storefront whenever the cart or coupon changes.
pub async fn quote(
    State(s): State<AppState>,
    session: AuthSession,
    Query(p): Query<QuoteParams>,
) -> Result<Json<QuoteResponse>> {
    let items = load_cart(&s, session.user_id).await?;
    require_non_empty(&items)?;
    let subtotal = cart_subtotal(&items);
    let stats = order_stats(&s, session.user_id).await?;
    let coupon = applied_coupon(&s, p.coupon.as_deref(), subtotal).await?;
    let fod = first_order_discount(stats.as_ref(), subtotal);
    let totals = PriceBreakdown::compose(
        subtotal,
        coupon.as_ref().map_or(0, |c| c.discount),
        fod,
    );
    Ok(Json(QuoteResponse {
        totals,
        coupon,
        first_order_eligible: first_order_eligible(stats.as_ref()),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingForm {
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
}

fn default_country() -> String {
    "IN".into()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate]
    pub shipping: ShippingForm,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub invoice_url: String,
}

pub async fn confirm(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    check(&r)?;
    let items = load_cart(&s, session.user_id).await?;
    require_non_empty(&items)?;
    let subtotal = cart_subtotal(&items);
    let stats = order_stats(&s, session.user_id).await?;
    let coupon = applied_coupon(&s, r.coupon_code.as_deref(), subtotal).await?;
    let fod = first_order_discount(stats.as_ref(), subtotal);
    let totals = PriceBreakdown::compose(
        subtotal,
        coupon.as_ref().map_or(0, |c| c.discount),
        fod,
    );

    let shipping = ShippingDetails {
        full_name: r.shipping.full_name,
        phone: r.shipping.phone,
        line1: r.shipping.line1,
        line2: r.shipping.line2,
        city: r.shipping.city,
        state: r.shipping.state,
        postal_code: r.shipping.postal_code,
        country: r.shipping.country,
    };

    let order = place_order(
        &s,
        OrderDraft {
            user_id: session.user_id,
            items: &items,
            shipping: &shipping,
            coupon,
            totals,
        },
    )
    .await?;

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at",
    )
    .bind(order.id)
    .fetch_all(&s.db)
    .await?;
    let invoice_url = order.invoice_url.clone().unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order,
            items,
            invoice_url,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32) -> CartItem {
        CartItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Nebula Tee".into(),
            unit_price: 1500,
            image_url: None,
            quantity,
            size: "M".into(),
            color: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_cart_is_rejected_before_pricing() {
        let err = require_non_empty(&[]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "cart is empty"));
    }

    #[test]
    fn non_empty_cart_passes() {
        assert!(require_non_empty(&[line(1)]).is_ok());
    }
}
