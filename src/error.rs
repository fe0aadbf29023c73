//! Service error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Coupon validation failures, surfaced verbatim to the storefront.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    #[error("coupon not found")]
    NotFound,

    #[error("coupon expired")]
    Expired,

    #[error("coupon usage limit reached")]
    UsageExceeded,

    #[error("order total below coupon minimum")]
    MinimumNotMet,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("generation service error: {0}")]
    Generation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Coupon(CouponError::NotFound) => StatusCode::NOT_FOUND,
            Self::Coupon(CouponError::UsageExceeded) => StatusCode::CONFLICT,
            Self::Coupon(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Generation(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // storage detail stays out of response bodies
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "database failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(CouponError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CouponError::UsageExceeded).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CouponError::MinimumNotMet).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
