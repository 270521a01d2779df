//! API error type and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::community::CommunityError;
use crate::database::StoreError;
use crate::models::UnknownVoice;
use crate::rating::{RatingError, VoteRejection};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or invalid x-actor-id header")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Rejected(#[from] VoteRejection),

    #[error(transparent)]
    UnknownVoice(#[from] UnknownVoice),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Rating(#[from] RatingError),

    #[error(transparent)]
    Community(#[from] CommunityError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::Rejected(_) => StatusCode::FORBIDDEN,
            ApiError::UnknownVoice(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => store_status(e),
            ApiError::Rating(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Rating(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Community(
                CommunityError::NotOrganizationOwner { .. } | CommunityError::NotManager { .. },
            ) => StatusCode::FORBIDDEN,
            ApiError::Community(CommunityError::Inactive(_)) => StatusCode::CONFLICT,
            ApiError::Community(CommunityError::Store(e)) => store_status(e),
        }
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Database(_) | StoreError::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
            // Internal details stay in the log
            let body = Json(json!({ "error": status.canonical_reason().unwrap_or("error") }));
            return (status, body).into_response();
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
