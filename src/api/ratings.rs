//! Moderation endpoints for ratings
//!
//! All routes require the admin key in the `x-admin-key` header and are
//! refused outright while no key is configured.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{ApiError, AppState};
use crate::models::{TargetKind, User, UserId, VoteTarget};
use crate::rating::SweepReport;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_api_key.as_deref() else {
        return Err(ApiError::Forbidden("Admin API key not configured".to_string()));
    };

    let supplied = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
    if supplied == Some(expected) {
        Ok(())
    } else {
        warn!("Invalid admin API key attempt");
        Err(ApiError::Forbidden("Invalid admin API key".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthorityRequest {
    pub authority: f64,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub target: VoteTarget,
    pub rating: i64,
}

/// POST /admin/users/recalculate
pub async fn recalculate_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, ApiError> {
    require_admin(&state, &headers)?;
    let report = state.aggregator.recalculate_user_ratings().await?;
    Ok(Json(report))
}

/// PUT /admin/users/{id}/authority
pub async fn set_authority(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<UserId>,
    Json(payload): Json<AuthorityRequest>,
) -> Result<Json<User>, ApiError> {
    require_admin(&state, &headers)?;
    if !payload.authority.is_finite() {
        return Err(ApiError::BadRequest("authority must be a finite number".to_string()));
    }

    let user = state.aggregator.assign_authority(id, payload.authority).await?;
    Ok(Json(user))
}

/// POST /admin/ratings/{kind}/{id}/refresh
pub async fn refresh_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Json<RefreshResponse>, ApiError> {
    require_admin(&state, &headers)?;
    let kind = TargetKind::parse(&kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown target kind '{}'", kind)))?;
    let target = VoteTarget::from_parts(kind, id);

    let rating = state.aggregator.refresh_rating(target).await?;
    info!(target = %target, rating = rating, "Rating refreshed by moderator");
    Ok(Json(RefreshResponse { target, rating }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/users/recalculate", post(recalculate_users))
        .route("/admin/users/{id}/authority", put(set_authority))
        .route("/admin/ratings/{kind}/{id}/refresh", post(refresh_rating))
        .with_state(state)
}
