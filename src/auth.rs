//! Bearer-token sessions and role gating.
//!
//! Account provisioning lives with the external identity provider; this
//! service only resolves tokens against the `sessions` table.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Designer,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "designer" => Some(Self::Designer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthSession {
    /// Admin passes every gate; other roles must match exactly.
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role || self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        let row: Option<(Uuid, String)> =
            sqlx::query_as("SELECT user_id, role FROM sessions WHERE token = $1")
                .bind(token)
                .fetch_optional(&state.db)
                .await?;
        let (user_id, role) = row.ok_or(ApiError::Unauthorized)?;
        let role = Role::parse(&role).ok_or(ApiError::Unauthorized)?;
        Ok(Self { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("designer"), Some(Role::Designer));
        assert_eq!(Role::parse("customer"), Some(Role::Customer));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn admin_passes_all_gates_customer_does_not() {
        let admin = AuthSession {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        let customer = AuthSession {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
        };
        assert!(admin.require(Role::Designer).is_ok());
        assert!(admin.require(Role::Customer).is_ok());
        assert!(customer.require(Role::Customer).is_ok());
        assert!(customer.require(Role::Admin).is_err());
        assert!(customer.require(Role::Designer).is_err());
    }
}
