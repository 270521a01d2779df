//! Vote endpoints
//!
//! `POST /{kind}/{id}/vote/{voice}` where voice is `like` or `unlike`.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::api::{ApiError, AppState, CurrentActor};
use crate::database::{ContentStore, VoteStore};
use crate::models::{CommentId, PublicationId, UserId, VoteTarget, VoteValue};

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub target: VoteTarget,
    pub value: VoteValue,
    pub created: bool,
    pub already_voted: bool,
    pub rating: i64,
}

async fn cast(
    state: &AppState,
    actor: CurrentActor,
    target: VoteTarget,
    voice: &str,
) -> Result<Json<VoteResponse>, ApiError> {
    let value: VoteValue = voice.parse()?;

    let voter = match state.store.get_user(actor.0).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Err(ApiError::Unauthenticated),
        Err(e) => return Err(e.into()),
    };
    let record = state.store.load_voteable(target).await?;

    if let Err(rejection) = state.policy.check(&voter, &record) {
        info!(voter = %voter.id, target = %target, reason = %rejection, "Vote rejected");
        return Err(rejection.into());
    }

    let outcome = state.aggregator.cast_vote(voter.id, target, value).await?;
    Ok(Json(VoteResponse {
        target,
        value: outcome.vote.value,
        created: outcome.created,
        already_voted: outcome.already_voted(),
        rating: outcome.rating,
    }))
}

/// POST /publications/{id}/vote/{voice}
pub async fn vote_publication(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((id, voice)): Path<(PublicationId, String)>,
) -> Result<Json<VoteResponse>, ApiError> {
    cast(&state, actor, VoteTarget::Publication(id), &voice).await
}

/// POST /comments/{id}/vote/{voice}
pub async fn vote_comment(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((id, voice)): Path<(CommentId, String)>,
) -> Result<Json<VoteResponse>, ApiError> {
    cast(&state, actor, VoteTarget::Comment(id), &voice).await
}

/// POST /users/{id}/vote/{voice}
pub async fn vote_user(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((id, voice)): Path<(UserId, String)>,
) -> Result<Json<VoteResponse>, ApiError> {
    cast(&state, actor, VoteTarget::User(id), &voice).await
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/publications/{id}/vote/{voice}", post(vote_publication))
        .route("/comments/{id}/vote/{voice}", post(vote_comment))
        .route("/users/{id}/vote/{voice}", post(vote_user))
        .with_state(state)
}
