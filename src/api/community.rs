//! Organization and project endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::{ApiError, AppState, CurrentActor};
use crate::models::{
    NewOrganization, NewProject, Organization, OrganizationId, Project, ProjectId, Subscribable,
    UserId,
};

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub target: Subscribable,
    pub user: UserId,
    /// False when the request changed nothing
    pub changed: bool,
}

fn validate_slug(slug: &str) -> Result<(), ApiError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid slug '{}'", slug)))
    }
}

/// POST /organizations
pub async fn create_organization(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<NewOrganization>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    validate_slug(&payload.slug)?;
    let organization = state.community.found_organization(actor, payload).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(payload): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    validate_slug(&payload.slug)?;
    let project = state.community.found_project(actor, payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn set_subscription(
    state: &AppState,
    actor: UserId,
    target: Subscribable,
    subscribe: bool,
) -> Result<Json<MembershipResponse>, ApiError> {
    let changed = if subscribe {
        state.community.subscribe(target, actor).await?
    } else {
        state.community.unsubscribe(target, actor).await?
    };
    Ok(Json(MembershipResponse {
        target,
        user: actor,
        changed,
    }))
}

/// POST /organizations/{id}/subscription
pub async fn subscribe_organization(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<OrganizationId>,
) -> Result<Json<MembershipResponse>, ApiError> {
    set_subscription(&state, actor, Subscribable::Organization(id), true).await
}

/// DELETE /organizations/{id}/subscription
pub async fn unsubscribe_organization(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<OrganizationId>,
) -> Result<Json<MembershipResponse>, ApiError> {
    set_subscription(&state, actor, Subscribable::Organization(id), false).await
}

/// POST /projects/{id}/subscription
pub async fn subscribe_project(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<ProjectId>,
) -> Result<Json<MembershipResponse>, ApiError> {
    set_subscription(&state, actor, Subscribable::Project(id), true).await
}

/// DELETE /projects/{id}/subscription
pub async fn unsubscribe_project(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<ProjectId>,
) -> Result<Json<MembershipResponse>, ApiError> {
    set_subscription(&state, actor, Subscribable::Project(id), false).await
}

/// PUT /projects/{id}/members/{user_id}
pub async fn add_project_member(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, user)): Path<(ProjectId, UserId)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let target = Subscribable::Project(id);
    state.community.ensure_manager(actor, target).await?;
    let changed = state.community.add_member(id, user).await?;
    Ok(Json(MembershipResponse {
        target,
        user,
        changed,
    }))
}

/// PUT /organizations/{id}/employees/{user_id}
pub async fn add_organization_employee(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, user)): Path<(OrganizationId, UserId)>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let target = Subscribable::Organization(id);
    state.community.ensure_manager(actor, target).await?;
    let changed = state.community.add_employee(id, user).await?;
    Ok(Json(MembershipResponse {
        target,
        user,
        changed,
    }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/organizations", post(create_organization))
        .route(
            "/organizations/{id}/subscription",
            post(subscribe_organization).delete(unsubscribe_organization),
        )
        .route(
            "/organizations/{id}/employees/{user_id}",
            put(add_organization_employee),
        )
        .route("/projects", post(create_project))
        .route(
            "/projects/{id}/subscription",
            post(subscribe_project).delete(unsubscribe_project),
        )
        .route("/projects/{id}/members/{user_id}", put(add_project_member))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("night-press-2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Night Press").is_err());
    }
}
