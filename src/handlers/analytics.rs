//! Admin analytics: storefront-wide aggregates over placed orders.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{AuthSession, Role};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_name: String,
    pub units: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DesignerRevenue {
    pub designer_id: Uuid,
    pub display_name: String,
    pub units: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub order_count: i64,
    pub gross_revenue: i64,
    pub total_discounts: i64,
    pub top_products: Vec<TopProduct>,
    pub designer_revenue: Vec<DesignerRevenue>,
}

/// Cancelled and refunded orders are excluded from every aggregate.
pub async fn summary(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<AnalyticsResponse>> {
    session.require(Role::Admin)?;

    let (order_count, gross_revenue, total_discounts): (i64, i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(total_amount), 0)::bigint, \
         COALESCE(SUM(coupon_discount + first_order_discount), 0)::bigint \
         FROM orders WHERE status NOT IN ('cancelled', 'refunded')",
    )
    .fetch_one(&s.db)
    .await?;

    let top_products = sqlx::query_as::<_, TopProduct>(
        "SELECT oi.product_name, COALESCE(SUM(oi.quantity), 0)::bigint AS units, \
         COALESCE(SUM(oi.total_price), 0)::bigint AS revenue \
         FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE o.status NOT IN ('cancelled', 'refunded') \
         GROUP BY oi.product_name ORDER BY revenue DESC LIMIT 10",
    )
    .fetch_all(&s.db)
    .await?;

    let designer_revenue = sqlx::query_as::<_, DesignerRevenue>(
        "SELECT d.id AS designer_id, d.display_name, \
         COALESCE(SUM(oi.quantity), 0)::bigint AS units, \
         COALESCE(SUM(oi.total_price), 0)::bigint AS revenue \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         JOIN products p ON p.id = oi.product_id \
         JOIN designers d ON d.id = p.designer_id \
         WHERE o.status NOT IN ('cancelled', 'refunded') \
         GROUP BY d.id, d.display_name ORDER BY revenue DESC",
    )
    .fetch_all(&s.db)
    .await?;

    Ok(Json(AnalyticsResponse {
        order_count,
        gross_revenue,
        total_discounts,
        top_products,
        designer_revenue,
    }))
}
