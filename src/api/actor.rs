//! Acting user
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in the `x-actor-id` header.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::ApiError;
use crate::models::UserId;

pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentActor(pub UserId);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| CurrentActor(UserId(id)))
            .ok_or(ApiError::Unauthenticated)
    }
}
