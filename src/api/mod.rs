//! HTTP API
//!
//! Thin axum glue over the rating core and the community service:
//! - Votes on publications, comments and users
//! - Publication page with its best comment thread
//! - Moderation (user rating sweep, authority, rating refresh)
//! - Organizations and projects
//! - Security middleware (actor check, rate limiting, headers)

pub mod actor;
pub mod community;
pub mod error;
pub mod middleware;
pub mod publications;
pub mod ratings;
pub mod votes;

use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::community::CommunityService;
use crate::config::RatingConfig;
use crate::database::Store;
use crate::rating::{RatingAggregator, VotingPolicy};

pub use actor::{CurrentActor, ACTOR_HEADER};
pub use error::ApiError;
pub use middleware::{
    auth_middleware, body_size_middleware, rate_limit_middleware, security_headers_middleware,
    RateLimiter, SecurityMiddlewareConfig, SecurityState,
};
pub use publications::PageContext;
pub use ratings::ADMIN_KEY_HEADER;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub aggregator: Arc<RatingAggregator>,
    pub community: Arc<CommunityService>,
    pub policy: VotingPolicy,
    pub admin_api_key: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, rating: &RatingConfig, admin_api_key: Option<String>) -> Self {
        let aggregator = RatingAggregator::new(store.clone(), rating.to_weights())
            .with_sweep_roles(rating.sweep_roles.clone());
        Self {
            aggregator: Arc::new(aggregator),
            community: Arc::new(CommunityService::new(store.clone())),
            policy: rating.to_policy(),
            store,
            admin_api_key,
        }
    }
}

/// All routes, without middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(votes::create_router(state.clone()))
        .merge(publications::create_router(state.clone()))
        .merge(ratings::create_router(state.clone()))
        .merge(community::create_router(state))
        .route("/health", get(|| async { "OK" }))
}

/// Routes wrapped in the security layers and request tracing
pub fn build_app(state: AppState, security: SecurityState) -> Router {
    create_router(state)
        .layer(from_fn_with_state(security.clone(), body_size_middleware))
        .layer(from_fn_with_state(security.clone(), auth_middleware))
        .layer(from_fn_with_state(security, rate_limit_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
}
