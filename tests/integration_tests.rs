//! Integration tests for the Nestor rating service
//!
//! End-to-end flows over the in-memory store: voting through the HTTP
//! router, best thread selection on the publication page, moderation
//! endpoints and community management.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use nestor::api::{
    build_app, AppState, SecurityMiddlewareConfig, SecurityState, ACTOR_HEADER, ADMIN_KEY_HEADER,
};
use nestor::config::RatingConfig;
use nestor::database::{ContentStore, MemoryStore};
use nestor::models::{Category, CategoryId, CommentId, PublicationId};
use nestor::{Comment, Publication, RatingAggregator, RatingWeights, Role, User, UserId, VoteTarget, VoteValue};

// ============================================================================
// Test Helpers
// ============================================================================

const ADMIN_KEY: &str = "test-admin-key-0123456789";

const AUTHOR: i64 = 1;
const READER: i64 = 2;
const TROLL: i64 = 3;
const MODERATOR: i64 = 4;

const PUBLICATION: i64 = 10;

/// Users, one publication and a small comment tree:
///
/// ```text
/// 100 (reader, +1)
/// └── 101 (troll, +5)
///     └── 103 (deleted, +9)
/// 102 (author, +5, newer than 101)
/// ```
async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store
        .insert_user(User::new(UserId(AUTHOR), "ada", Role::Author).with_authority(2.0))
        .await;
    store.insert_user(User::new(UserId(READER), "ben", Role::Reader)).await;
    let mut troll = User::new(UserId(TROLL), "cy", Role::Reader);
    troll.rating = -20.0;
    store.insert_user(troll).await;
    store
        .insert_user(User::new(UserId(MODERATOR), "dee", Role::Moderator))
        .await;

    store
        .insert_publication(Publication::new(
            PublicationId(PUBLICATION),
            UserId(AUTHOR),
            "On Ratings",
        ))
        .await;
    store
        .insert_category(Category {
            id: CategoryId(1),
            title: "Essays".to_string(),
            slug: "essays".to_string(),
            author: UserId(AUTHOR),
        })
        .await;

    let base = Utc::now() - Duration::hours(1);
    let comment = |id: i64, author: i64, rating: i64, minutes: i64| {
        let mut c = Comment::new(
            CommentId(id),
            PublicationId(PUBLICATION),
            UserId(author),
            format!("comment {}", id),
        );
        c.rating = rating;
        c.created_at = base + Duration::minutes(minutes);
        c
    };

    store.insert_comment(comment(100, READER, 1, 0)).await;
    store
        .insert_comment(comment(101, TROLL, 5, 1).reply_to(CommentId(100)))
        .await;
    store.insert_comment(comment(102, AUTHOR, 5, 2)).await;
    let mut deleted = comment(103, READER, 9, 3).reply_to(CommentId(101));
    deleted.is_deleted = true;
    store.insert_comment(deleted).await;

    store
}

fn app_for(store: Arc<MemoryStore>) -> Router {
    let state = AppState::new(store, &RatingConfig::default(), Some(ADMIN_KEY.to_string()));
    build_app(state, SecurityState::new(SecurityMiddlewareConfig::default()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<i64>,
    admin_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor.to_string());
    }
    if let Some(key) = admin_key {
        builder = builder.header(ADMIN_KEY_HEADER, key);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ============================================================================
// Voting
// ============================================================================

mod voting {
    use super::*;

    #[tokio::test]
    async fn test_vote_updates_publication_rating() {
        let store = seeded_store().await;
        let app = app_for(store.clone());
        let uri = format!("/publications/{}/vote/like", PUBLICATION);

        let (status, body) = send(&app, "POST", &uri, Some(READER), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], json!(true));
        assert_eq!(body["already_voted"], json!(false));
        assert_eq!(body["rating"], json!(1));

        let (_, body) = send(&app, "POST", &uri.replace("like", "unlike"), Some(MODERATOR), None, None).await;
        assert_eq!(body["rating"], json!(0));

        let stored = store.get_publication(PublicationId(PUBLICATION)).await.unwrap();
        assert_eq!(stored.rating, 0);
    }

    #[tokio::test]
    async fn test_repeat_vote_reports_already_voted() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        let like = format!("/publications/{}/vote/like", PUBLICATION);
        let unlike = format!("/publications/{}/vote/unlike", PUBLICATION);
        send(&app, "POST", &like, Some(READER), None, None).await;

        let (status, body) = send(&app, "POST", &unlike, Some(READER), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["already_voted"], json!(true));
        assert_eq!(body["value"], json!("like"));
        assert_eq!(body["rating"], json!(1));
        assert_eq!(store.vote_count().await, 1);
    }

    #[tokio::test]
    async fn test_self_vote_forbidden() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        let uri = format!("/publications/{}/vote/like", PUBLICATION);
        let (status, _) = send(&app, "POST", &uri, Some(AUTHOR), None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "POST", "/users/2/vote/like", Some(READER), None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(store.vote_count().await, 0);
    }

    #[tokio::test]
    async fn test_low_standing_cannot_vote_on_comments() {
        let app = app_for(seeded_store().await);

        let (status, _) = send(&app, "POST", "/comments/102/vote/unlike", Some(TROLL), None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/publications/{}/vote/unlike", PUBLICATION);
        let (status, _) = send(&app, "POST", &uri, Some(TROLL), None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_comment_vote_replaces_cached_rating() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        // Seeded +5 is a stale cache; the recount starts from the votes
        let (status, body) = send(&app, "POST", "/comments/102/vote/like", Some(READER), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rating"], json!(1));
        assert_eq!(store.get_comment(CommentId(102)).await.unwrap().rating, 1);
    }

    #[tokio::test]
    async fn test_user_vote_goes_to_vote_rating() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        let (status, body) = send(&app, "POST", "/users/1/vote/unlike", Some(READER), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rating"], json!(-1));

        let user = store.get_user(UserId(AUTHOR)).await.unwrap();
        assert_eq!(user.vote_rating, -1);
        assert_eq!(user.rating, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_voice_rejected() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        let uri = format!("/publications/{}/vote/meh", PUBLICATION);
        let (status, body) = send(&app, "POST", &uri, Some(READER), None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("meh"));
        assert_eq!(store.vote_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_actor_unauthorized() {
        let app = app_for(seeded_store().await);
        let uri = format!("/publications/{}/vote/like", PUBLICATION);

        let (status, _) = send(&app, "POST", &uri, None, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Unknown actor id
        let (status, _) = send(&app, "POST", &uri, Some(999), None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_vote_on_missing_target() {
        let app = app_for(seeded_store().await);
        let (status, _) = send(&app, "POST", "/comments/4040/vote/like", Some(READER), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_rating_unchanged() {
        let store = seeded_store().await;
        let aggregator = RatingAggregator::new(store.clone(), RatingWeights::default());
        let target = VoteTarget::Publication(PublicationId(PUBLICATION));

        aggregator.cast_vote(UserId(READER), target, VoteValue::Like).await.unwrap();
        store.set_write_failure(true);

        let mut publication = store.get_publication(PublicationId(PUBLICATION)).await.unwrap();
        let votes = vec![nestor::Vote::new(UserId(MODERATOR), target, VoteValue::Unlike)];
        assert!(aggregator.recalculate_rating(&mut publication, &votes).await.is_err());
        assert_eq!(publication.rating, 1);

        store.set_write_failure(false);
        assert_eq!(
            store.get_publication(PublicationId(PUBLICATION)).await.unwrap().rating,
            1
        );
    }
}

// ============================================================================
// Best comment thread
// ============================================================================

mod best_thread {
    use super::*;

    #[tokio::test]
    async fn test_publication_page() {
        let app = app_for(seeded_store().await);
        let uri = format!("/publications/{}", PUBLICATION);

        let (status, body) = send(&app, "GET", &uri, None, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["publication"]["title"], json!("On Ratings"));
        assert_eq!(body["context"]["categories"][0]["slug"], json!("essays"));

        let roots: Vec<i64> = body["root_comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(roots.len(), 2);
        assert!(roots.contains(&100) && roots.contains(&102));

        // 101 and 102 tie on rating; 101 is older. Deleted 103 never wins.
        let thread = &body["best_thread"];
        assert_eq!(thread["best"], json!(101));
        assert_eq!(thread["truncated"], json!(false));
        let chain: Vec<i64> = thread["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(chain, vec![100, 101]);
    }

    #[tokio::test]
    async fn test_best_thread_follows_votes() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        // Recounts leave 100 at +2 and 101, 102 at 0 and +1
        send(&app, "POST", "/comments/100/vote/like", Some(AUTHOR), None, None).await;
        send(&app, "POST", "/comments/100/vote/like", Some(MODERATOR), None, None).await;
        send(&app, "POST", "/comments/101/vote/like", Some(READER), None, None).await;
        send(&app, "POST", "/comments/101/vote/unlike", Some(AUTHOR), None, None).await;
        send(&app, "POST", "/comments/102/vote/like", Some(READER), None, None).await;

        let uri = format!("/publications/{}/best-thread", PUBLICATION);
        let (status, body) = send(&app, "GET", &uri, None, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["best"], json!(100));
        assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dangling_parent_truncates_thread() {
        let store = seeded_store().await;
        let mut orphan = Comment::new(
            CommentId(200),
            PublicationId(PUBLICATION),
            UserId(READER),
            "reply to a comment on another publication",
        )
        .reply_to(CommentId(9999));
        orphan.rating = 50;
        store.insert_comment(orphan).await;

        let app = app_for(store);
        let uri = format!("/publications/{}/best-thread", PUBLICATION);
        let (_, body) = send(&app, "GET", &uri, None, None, None).await;
        assert_eq!(body["best"], json!(200));
        assert_eq!(body["truncated"], json!(true));
        assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publication_without_comments() {
        let store = seeded_store().await;
        store
            .insert_publication(Publication::new(PublicationId(11), UserId(AUTHOR), "Quiet"))
            .await;
        let app = app_for(store);

        let (status, body) = send(&app, "GET", "/publications/11", None, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["best_thread"], Value::Null);

        let (status, _) = send(&app, "GET", "/publications/12/best-thread", None, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Author pages
// ============================================================================

mod author_pages {
    use super::*;

    #[tokio::test]
    async fn test_author_publications_follow_votes() {
        let store = seeded_store().await;
        store
            .insert_publication(Publication::new(PublicationId(11), UserId(AUTHOR), "Second"))
            .await;
        let app = app_for(store);

        send(&app, "POST", "/publications/11/vote/like", Some(READER), None, None).await;
        let uri = format!("/publications/{}/vote/unlike", PUBLICATION);
        send(&app, "POST", &uri, Some(READER), None, None).await;

        let (status, body) = send(&app, "GET", "/users/1/publications", None, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["author"]["username"], json!("ada"));
        let ids: Vec<i64> = body["publications"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![11, PUBLICATION]);

        let (status, _) = send(&app, "GET", "/users/404/publications", None, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Moderation
// ============================================================================

mod moderation {
    use super::*;

    #[tokio::test]
    async fn test_sweep_requires_admin_key() {
        let app = app_for(seeded_store().await);

        let (status, _) = send(&app, "POST", "/admin/users/recalculate", None, None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "POST", "/admin/users/recalculate", None, Some("wrong-key-wrong-key"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_sweep_applies_formula() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        // Publication +1 by the author; comment 102 recounted to +1
        let publication = format!("/publications/{}/vote/like", PUBLICATION);
        send(&app, "POST", &publication, Some(READER), None, None).await;
        send(&app, "POST", "/comments/102/vote/like", Some(READER), None, None).await;

        let (status, body) = send(&app, "POST", "/admin/users/recalculate", None, Some(ADMIN_KEY), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users_updated"], json!(2));

        // 2.0 * 1.0 + 1 * 1.0 + 1 * 0.5
        let author = store.get_user(UserId(AUTHOR)).await.unwrap();
        assert_eq!(author.rating, 3.5);

        // Readers are outside the sweep
        let reader = store.get_user(UserId(READER)).await.unwrap();
        assert_eq!(reader.rating, 0.0);
    }

    #[tokio::test]
    async fn test_assign_authority() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        let (status, body) = send(
            &app,
            "PUT",
            "/admin/users/4/authority",
            None,
            Some(ADMIN_KEY),
            Some(json!({ "authority": 7.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authority"], json!(7.5));
        assert_eq!(body["rating"], json!(7.5));
        assert_eq!(store.get_user(UserId(MODERATOR)).await.unwrap().authority, 7.5);

        let (status, _) = send(
            &app,
            "PUT",
            "/admin/users/404/authority",
            None,
            Some(ADMIN_KEY),
            Some(json!({ "authority": 1.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_rating() {
        let store = seeded_store().await;
        let app = app_for(store.clone());

        // No votes behind the seeded +5
        let (status, body) = send(&app, "POST", "/admin/ratings/comment/101/refresh", None, Some(ADMIN_KEY), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rating"], json!(0));
        assert_eq!(store.get_comment(CommentId(101)).await.unwrap().rating, 0);

        let (status, _) = send(&app, "POST", "/admin/ratings/essay/101/refresh", None, Some(ADMIN_KEY), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

// ============================================================================
// Communities
// ============================================================================

mod communities {
    use super::*;

    async fn found_org(app: &Router) -> i64 {
        let (status, body) = send(
            app,
            "POST",
            "/organizations",
            Some(AUTHOR),
            None,
            Some(json!({ "title": "Night Press", "slug": "night-press" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_founder_is_subscribed() {
        let app = app_for(seeded_store().await);

        let (status, body) = send(
            &app,
            "POST",
            "/organizations",
            Some(AUTHOR),
            None,
            Some(json!({ "title": "Night Press", "slug": "night-press" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["founder"], json!(AUTHOR));
        assert_eq!(body["subscribers"], json!([AUTHOR]));
    }

    #[tokio::test]
    async fn test_org_project_needs_owner() {
        let app = app_for(seeded_store().await);
        let org = found_org(&app).await;
        let project = json!({ "title": "Almanac", "slug": "almanac", "organization": org });

        let (status, _) = send(&app, "POST", "/projects", Some(READER), None, Some(project.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, "POST", "/projects", Some(AUTHOR), None, Some(project)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["founder"], json!({ "kind": "organization", "id": org }));
        assert_eq!(body["subscribers"], json!([AUTHOR]));
    }

    #[tokio::test]
    async fn test_subscription_round_trip() {
        let app = app_for(seeded_store().await);
        let org = found_org(&app).await;
        let uri = format!("/organizations/{}/subscription", org);

        let (_, body) = send(&app, "POST", &uri, Some(READER), None, None).await;
        assert_eq!(body["changed"], json!(true));
        let (_, body) = send(&app, "POST", &uri, Some(READER), None, None).await;
        assert_eq!(body["changed"], json!(false));
        let (_, body) = send(&app, "DELETE", &uri, Some(READER), None, None).await;
        assert_eq!(body["changed"], json!(true));
    }

    #[tokio::test]
    async fn test_only_manager_adds_members() {
        let app = app_for(seeded_store().await);
        let (_, body) = send(
            &app,
            "POST",
            "/projects",
            Some(READER),
            None,
            Some(json!({ "title": "Zine", "slug": "zine" })),
        )
        .await;
        let project = body["id"].as_i64().unwrap();
        let uri = format!("/projects/{}/members/{}", project, MODERATOR);

        let (status, _) = send(&app, "PUT", &uri, Some(AUTHOR), None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, "PUT", &uri, Some(READER), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], json!(true));
    }

    #[tokio::test]
    async fn test_invalid_slug() {
        let app = app_for(seeded_store().await);
        let (status, _) = send(
            &app,
            "POST",
            "/organizations",
            Some(AUTHOR),
            None,
            Some(json!({ "title": "Night Press", "slug": "Night Press" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
