//! Storage seams used by the rating core and the HTTP layer
//!
//! `DatabasePool` (PostgreSQL) and `MemoryStore` both implement these. The
//! service holds an `Arc<dyn Store>` so either can back it.

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{
    Category, Comment, NewOrganization, NewProject, Organization, OrganizationId, Owner,
    Project, ProjectId, Publication, PublicationId, Role, Subscribable, User, UserId, Vote,
    VoteTarget, VoteValue, VoteableRecord, VoteableRef,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ratings of everything a user authored, input to the user-rating formula
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubRatings {
    pub publication_ratings: Vec<i64>,
    pub comment_ratings: Vec<i64>,
}

/// Votes and rating writes
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Every vote whose target equals `target`, oldest first
    async fn load_votes_for_target(&self, target: VoteTarget) -> StoreResult<Vec<Vote>>;

    /// Insert a vote unless `(voter, target)` already voted. Returns the
    /// stored vote and whether this call created it.
    async fn create_vote_if_absent(
        &self,
        voter: UserId,
        target: VoteTarget,
        value: VoteValue,
    ) -> StoreResult<(Vote, bool)>;

    /// Persist the rating carried by a recalculated entity
    async fn save_voteable(&self, entity: VoteableRef<'_>) -> StoreResult<()>;

    /// Re-sum the votes on `target` into its cached rating as one atomic
    /// step and return the stored value. Concurrent recounts on the same
    /// target serialize, so the last write always covers every committed vote.
    async fn recount_rating(&self, target: VoteTarget) -> StoreResult<i64>;

    async fn load_voteable(&self, target: VoteTarget) -> StoreResult<VoteableRecord>;

    async fn load_sub_ratings_for_user(&self, user: UserId) -> StoreResult<SubRatings>;

    /// Persist a user's composite rating and authority
    async fn save_user(&self, user: &User) -> StoreResult<()>;

    /// Persist only the composite rating; authority is left as stored
    async fn save_user_rating(&self, user: UserId, rating: f64) -> StoreResult<()>;
}

/// Read side of publications, comments, users and categories
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> StoreResult<User>;

    async fn users_with_roles(&self, roles: &[Role]) -> StoreResult<Vec<User>>;

    async fn get_publication(&self, id: PublicationId) -> StoreResult<Publication>;

    /// Publications written by `author`, highest rating first, ties by id
    async fn publications_by_author(&self, author: UserId) -> StoreResult<Vec<Publication>>;

    /// All comments on a publication, deleted ones included
    async fn comments_for_publication(&self, id: PublicationId) -> StoreResult<Vec<Comment>>;

    async fn categories(&self) -> StoreResult<Vec<Category>>;
}

/// Organizations, projects and the user sets hanging off them
#[async_trait]
pub trait CommunityStore: Send + Sync {
    /// Insert an organization with its founder already subscribed. Either
    /// both land or neither does.
    async fn insert_organization(
        &self,
        founder: UserId,
        new: NewOrganization,
    ) -> StoreResult<Organization>;

    async fn get_organization(&self, id: OrganizationId) -> StoreResult<Organization>;

    /// Insert a project with `subscriber` already subscribed, as one write
    async fn insert_project(
        &self,
        founder: Owner,
        subscriber: UserId,
        new: NewProject,
    ) -> StoreResult<Project>;

    async fn get_project(&self, id: ProjectId) -> StoreResult<Project>;

    /// Returns false when the user was already subscribed
    async fn add_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool>;

    /// Returns false when the user was not subscribed
    async fn remove_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool>;

    async fn add_project_member(&self, project: ProjectId, user: UserId) -> StoreResult<bool>;

    async fn add_employee(&self, organization: OrganizationId, user: UserId)
        -> StoreResult<bool>;
}

pub trait Store: VoteStore + ContentStore + CommunityStore {}

impl<T: VoteStore + ContentStore + CommunityStore> Store for T {}
