//! HTTP handlers.

pub mod addresses;
pub mod analytics;
pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod designers;
pub mod designs;
pub mod orders;
pub mod products;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub designer: Option<uuid::Uuid>,
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub(crate) fn page_bounds(p: &ListParams) -> (u32, i64, i64) {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    (page, per_page as i64, ((page - 1) * per_page) as i64)
}

pub(crate) async fn cart_subtotal_for(
    s: &crate::AppState,
    user_id: uuid::Uuid,
) -> std::result::Result<i64, crate::error::ApiError> {
    let items = cart::load_cart(s, user_id).await?;
    Ok(cart::cart_subtotal(&items))
}

/// Flattens validator output into one user-facing message.
pub(crate) fn check(
    input: &impl validator::Validate,
) -> std::result::Result<(), crate::error::ApiError> {
    input
        .validate()
        .map_err(|e| crate::error::ApiError::Validation(e.to_string()))
}
