//! Publication page endpoints and an author's publication list

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use crate::api::{ApiError, AppState};
use crate::database::{ContentStore, Store, StoreResult};
use crate::models::{Category, Comment, CommentId, Publication, PublicationId, User, UserId};
use crate::rating::{select_best_thread, CommentThread};

/// Navigation data shared by every page, loaded fresh per request
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub categories: Vec<Category>,
}

impl PageContext {
    pub async fn load(store: &dyn Store) -> StoreResult<Self> {
        Ok(Self {
            categories: store.categories().await?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub best: CommentId,
    pub truncated: bool,
    /// Root first
    pub comments: Vec<Comment>,
}

impl From<&CommentThread<'_>> for ThreadResponse {
    fn from(thread: &CommentThread<'_>) -> Self {
        Self {
            best: thread.best().id,
            truncated: thread.is_truncated(),
            comments: thread.to_owned_comments(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicationPage {
    pub context: PageContext,
    pub publication: Publication,
    pub root_comments: Vec<Comment>,
    pub best_thread: Option<ThreadResponse>,
}

/// GET /publications/{id}
pub async fn get_publication(
    State(state): State<AppState>,
    Path(id): Path<PublicationId>,
) -> Result<Json<PublicationPage>, ApiError> {
    let context = PageContext::load(state.store.as_ref()).await?;
    let publication = state.store.get_publication(id).await?;
    let comments = state.store.comments_for_publication(id).await?;

    let best_thread = select_best_thread(&comments).map(|t| ThreadResponse::from(&t));
    let root_comments = comments
        .iter()
        .filter(|c| c.is_root() && !c.is_deleted)
        .cloned()
        .collect();

    debug!(
        publication_id = %id,
        comments = comments.len(),
        has_best_thread = best_thread.is_some(),
        "Rendered publication page"
    );

    Ok(Json(PublicationPage {
        context,
        publication,
        root_comments,
        best_thread,
    }))
}

/// GET /publications/{id}/best-thread
pub async fn get_best_thread(
    State(state): State<AppState>,
    Path(id): Path<PublicationId>,
) -> Result<Json<Option<ThreadResponse>>, ApiError> {
    // 404 for an unknown publication rather than an empty thread
    state.store.get_publication(id).await?;
    let comments = state.store.comments_for_publication(id).await?;
    Ok(Json(
        select_best_thread(&comments).map(|t| ThreadResponse::from(&t)),
    ))
}

#[derive(Debug, Serialize)]
pub struct AuthorPage {
    pub context: PageContext,
    pub author: User,
    /// Highest rated first
    pub publications: Vec<Publication>,
}

/// GET /users/{id}/publications
pub async fn get_author_publications(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<AuthorPage>, ApiError> {
    let context = PageContext::load(state.store.as_ref()).await?;
    let author = state.store.get_user(id).await?;
    let publications = state.store.publications_by_author(id).await?;

    Ok(Json(AuthorPage {
        context,
        author,
        publications,
    }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/publications/{id}", get(get_publication))
        .route("/publications/{id}/best-thread", get(get_best_thread))
        .route("/users/{id}/publications", get(get_author_publications))
        .with_state(state)
}
