//! Database Connection Pool using sqlx

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::database::community::CommunityRepository;
use crate::database::content::ContentRepository;
use crate::database::store::{
    CommunityStore, ContentStore, StoreResult, SubRatings, VoteStore,
};
use crate::database::votes::VoteRepository;
use crate::models::{
    Category, Comment, NewOrganization, NewProject, Organization, OrganizationId, Owner,
    Project, ProjectId, Publication, PublicationId, Role, Subscribable, User, UserId, Vote,
    VoteTarget, VoteValue, VoteableRecord, VoteableRef,
};

pub struct DatabasePool {
    pool: PgPool,
    votes: VoteRepository,
    content: ContentRepository,
    community: CommunityRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        info!("Connected to PostgreSQL");

        Ok(Self {
            votes: VoteRepository::new(pool.clone()),
            content: ContentRepository::new(pool.clone()),
            community: CommunityRepository::new(pool.clone()),
            pool,
        })
    }

    /// Create the schema and every table; safe to run on each start
    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing database schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS nestor")
            .execute(&self.pool)
            .await?;

        // Order follows foreign keys: users before votes and communities
        self.content.init_schema().await?;
        self.votes.init_schema().await?;
        self.community.init_schema().await?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[async_trait]
impl VoteStore for DatabasePool {
    async fn load_votes_for_target(&self, target: VoteTarget) -> StoreResult<Vec<Vote>> {
        self.votes.for_target(target).await
    }

    async fn create_vote_if_absent(
        &self,
        voter: UserId,
        target: VoteTarget,
        value: VoteValue,
    ) -> StoreResult<(Vote, bool)> {
        // Reject votes on missing targets before touching the votes table
        self.load_voteable(target).await?;
        self.votes.create_if_absent(voter, target, value).await
    }

    async fn save_voteable(&self, entity: VoteableRef<'_>) -> StoreResult<()> {
        self.votes.save_rating(entity).await
    }

    async fn recount_rating(&self, target: VoteTarget) -> StoreResult<i64> {
        self.votes.recount_rating(target).await
    }

    async fn load_voteable(&self, target: VoteTarget) -> StoreResult<VoteableRecord> {
        Ok(match target {
            VoteTarget::Publication(id) => {
                VoteableRecord::Publication(self.content.get_publication(id).await?)
            }
            VoteTarget::Comment(id) => VoteableRecord::Comment(self.content.get_comment(id).await?),
            VoteTarget::User(id) => VoteableRecord::User(self.content.get_user(id).await?),
        })
    }

    async fn load_sub_ratings_for_user(&self, user: UserId) -> StoreResult<SubRatings> {
        self.content.get_user(user).await?;
        self.votes.sub_ratings(user).await
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.content.save_user(user).await
    }

    async fn save_user_rating(&self, user: UserId, rating: f64) -> StoreResult<()> {
        self.content.save_user_rating(user, rating).await
    }
}

#[async_trait]
impl ContentStore for DatabasePool {
    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.content.get_user(id).await
    }

    async fn users_with_roles(&self, roles: &[Role]) -> StoreResult<Vec<User>> {
        self.content.users_with_roles(roles).await
    }

    async fn get_publication(&self, id: PublicationId) -> StoreResult<Publication> {
        self.content.get_publication(id).await
    }

    async fn publications_by_author(&self, author: UserId) -> StoreResult<Vec<Publication>> {
        self.content.publications_by_author(author).await
    }

    async fn comments_for_publication(&self, id: PublicationId) -> StoreResult<Vec<Comment>> {
        self.content.get_publication(id).await?;
        self.content.comments_for_publication(id).await
    }

    async fn categories(&self) -> StoreResult<Vec<Category>> {
        self.content.categories().await
    }
}

#[async_trait]
impl CommunityStore for DatabasePool {
    async fn insert_organization(
        &self,
        founder: UserId,
        new: NewOrganization,
    ) -> StoreResult<Organization> {
        self.community.insert_organization(founder, new).await
    }

    async fn get_organization(&self, id: OrganizationId) -> StoreResult<Organization> {
        self.community.get_organization(id).await
    }

    async fn insert_project(
        &self,
        founder: Owner,
        subscriber: UserId,
        new: NewProject,
    ) -> StoreResult<Project> {
        self.community.insert_project(founder, subscriber, new).await
    }

    async fn get_project(&self, id: ProjectId) -> StoreResult<Project> {
        self.community.get_project(id).await
    }

    async fn add_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool> {
        self.community.add_subscriber(target, user).await
    }

    async fn remove_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool> {
        self.community.remove_subscriber(target, user).await
    }

    async fn add_project_member(&self, project: ProjectId, user: UserId) -> StoreResult<bool> {
        self.community.add_project_member(project, user).await
    }

    async fn add_employee(
        &self,
        organization: OrganizationId,
        user: UserId,
    ) -> StoreResult<bool> {
        self.community.add_employee(organization, user).await
    }
}
