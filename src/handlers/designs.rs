//! AI design generation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::check;
use crate::auth::AuthSession;
use crate::error::{ApiError, Result};
use crate::events::{self, StoreEvent};
use crate::generation::GENERATION_QUOTA;
use crate::models::{Design, GenerationStats};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateDesignRequest {
    #[validate(length(min = 3, max = 500))]
    pub prompt: String,
}

pub async fn generate_design(
    State(s): State<AppState>,
    session: AuthSession,
    Json(r): Json<GenerateDesignRequest>,
) -> Result<(StatusCode, Json<Design>)> {
    check(&r)?;
    let Some(generator) = &s.generator else {
        return Err(ApiError::Generation(
            "generation service not configured".into(),
        ));
    };

    // Quota is reserved atomically before the upstream call; a failed
    // generation still spends the slot. Placing an order resets a spent
    // counter (see assembler).
    let reserved = sqlx::query(
        "INSERT INTO user_generation_stats (user_id, generation_count, updated_at) \
         VALUES ($1, 1, NOW()) \
         ON CONFLICT (user_id) DO UPDATE SET \
         generation_count = user_generation_stats.generation_count + 1, updated_at = NOW() \
         WHERE user_generation_stats.generation_count < $2",
    )
    .bind(session.user_id)
    .bind(GENERATION_QUOTA)
    .execute(&s.db)
    .await?;
    if reserved.rows_affected() == 0 {
        return Err(ApiError::Validation(
            "generation quota exhausted; place an order to reset it".into(),
        ));
    }

    let image_url = generator.generate(&r.prompt).await?;

    let design = sqlx::query_as::<_, Design>(
        "INSERT INTO designs (id, user_id, prompt, image_url, created_at) \
         VALUES ($1, $2, $3, $4, NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(session.user_id)
    .bind(&r.prompt)
    .bind(&image_url)
    .fetch_one(&s.db)
    .await?;

    events::publish(
        &s.nats,
        StoreEvent::DesignGenerated {
            design_id: design.id,
            user_id: design.user_id,
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(design)))
}

#[derive(Debug, serde::Serialize)]
pub struct QuotaResponse {
    pub used: i32,
    pub limit: i32,
}

/// Lets the storefront show how many generations remain before an order is
/// needed to reset the counter.
pub async fn generation_quota(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<QuotaResponse>> {
    let stats = sqlx::query_as::<_, GenerationStats>(
        "SELECT * FROM user_generation_stats WHERE user_id = $1",
    )
    .bind(session.user_id)
    .fetch_optional(&s.db)
    .await?;
    Ok(Json(QuotaResponse {
        used: stats.map_or(0, |g| g.generation_count),
        limit: GENERATION_QUOTA,
    }))
}

pub async fn list_designs(
    State(s): State<AppState>,
    session: AuthSession,
) -> Result<Json<Vec<Design>>> {
    let designs = sqlx::query_as::<_, Design>(
        "SELECT * FROM designs WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(session.user_id)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(designs))
}
