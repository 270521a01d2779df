//! In-memory store
//!
//! Used when PostgreSQL is disabled and by tests. All state sits behind one
//! lock so create-if-absent and rating writes are atomic with respect to
//! other callers.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::database::store::{
    CommunityStore, ContentStore, StoreError, StoreResult, SubRatings, VoteStore,
};
use crate::models::{
    Category, CategoryId, Comment, CommentId, NewOrganization, NewProject, Organization,
    OrganizationId, Owner, Project, ProjectId, Publication, PublicationId, Role, Subscribable,
    User, UserId, Vote, VoteTarget, VoteValue, VoteableRecord, VoteableRef,
};

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    publications: BTreeMap<PublicationId, Publication>,
    comments: BTreeMap<CommentId, Comment>,
    categories: BTreeMap<CategoryId, Category>,
    organizations: BTreeMap<OrganizationId, Organization>,
    projects: BTreeMap<ProjectId, Project>,

    /// Insertion order doubles as vote age
    votes: Vec<Vote>,
    vote_index: HashSet<(UserId, VoteTarget)>,

    next_organization_id: i64,
    next_project_id: i64,
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with `StoreError::Unavailable`
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is rejecting writes".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id, user);
    }

    pub async fn insert_publication(&self, publication: Publication) {
        self.inner
            .write()
            .await
            .publications
            .insert(publication.id, publication);
    }

    pub async fn insert_comment(&self, comment: Comment) {
        self.inner.write().await.comments.insert(comment.id, comment);
    }

    pub async fn insert_category(&self, category: Category) {
        self.inner
            .write()
            .await
            .categories
            .insert(category.id, category);
    }

    pub async fn get_comment(&self, id: CommentId) -> StoreResult<Comment> {
        self.inner
            .read()
            .await
            .comments
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("comment", id))
    }

    pub async fn vote_count(&self) -> usize {
        self.inner.read().await.votes.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn target_exists(inner: &Inner, target: VoteTarget) -> bool {
    match target {
        VoteTarget::Publication(id) => inner.publications.contains_key(&id),
        VoteTarget::Comment(id) => inner.comments.contains_key(&id),
        VoteTarget::User(id) => inner.users.contains_key(&id),
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn load_votes_for_target(&self, target: VoteTarget) -> StoreResult<Vec<Vote>> {
        let inner = self.inner.read().await;
        Ok(inner
            .votes
            .iter()
            .filter(|v| v.target == target)
            .cloned()
            .collect())
    }

    async fn create_vote_if_absent(
        &self,
        voter: UserId,
        target: VoteTarget,
        value: VoteValue,
    ) -> StoreResult<(Vote, bool)> {
        let mut inner = self.inner.write().await;

        if inner.vote_index.contains(&(voter, target)) {
            let existing = inner
                .votes
                .iter()
                .find(|v| v.voter == voter && v.target == target)
                .cloned()
                .ok_or_else(|| StoreError::Corrupt(format!("vote index out of sync for {}", target)))?;
            return Ok((existing, false));
        }

        self.check_writable()?;
        if !target_exists(&inner, target) {
            return Err(StoreError::not_found(target.kind().as_str(), target.raw_id()));
        }

        let vote = Vote::new(voter, target, value);
        inner.vote_index.insert((voter, target));
        inner.votes.push(vote.clone());
        debug!(voter = %voter, target = %target, value = vote.value.signed(), "Stored vote");

        Ok((vote, true))
    }

    async fn save_voteable(&self, entity: VoteableRef<'_>) -> StoreResult<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;

        match entity {
            VoteableRef::Publication(p) => {
                let stored = inner
                    .publications
                    .get_mut(&p.id)
                    .ok_or_else(|| StoreError::not_found("publication", p.id))?;
                stored.rating = p.rating;
                stored.updated_at = Utc::now();
            }
            VoteableRef::Comment(c) => {
                let stored = inner
                    .comments
                    .get_mut(&c.id)
                    .ok_or_else(|| StoreError::not_found("comment", c.id))?;
                stored.rating = c.rating;
            }
            VoteableRef::User(u) => {
                let stored = inner
                    .users
                    .get_mut(&u.id)
                    .ok_or_else(|| StoreError::not_found("user", u.id))?;
                stored.vote_rating = u.vote_rating;
            }
        }

        Ok(())
    }

    async fn recount_rating(&self, target: VoteTarget) -> StoreResult<i64> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let rating: i64 = inner
            .votes
            .iter()
            .filter(|v| v.target == target)
            .map(|v| v.value.signed())
            .sum();

        let missing = || StoreError::not_found(target.kind().as_str(), target.raw_id());
        match target {
            VoteTarget::Publication(id) => {
                let stored = inner.publications.get_mut(&id).ok_or_else(missing)?;
                stored.rating = rating;
                stored.updated_at = Utc::now();
            }
            VoteTarget::Comment(id) => {
                inner.comments.get_mut(&id).ok_or_else(missing)?.rating = rating;
            }
            VoteTarget::User(id) => {
                inner.users.get_mut(&id).ok_or_else(missing)?.vote_rating = rating;
            }
        }

        Ok(rating)
    }

    async fn load_voteable(&self, target: VoteTarget) -> StoreResult<VoteableRecord> {
        let inner = self.inner.read().await;
        let record = match target {
            VoteTarget::Publication(id) => inner
                .publications
                .get(&id)
                .cloned()
                .map(VoteableRecord::Publication),
            VoteTarget::Comment(id) => inner.comments.get(&id).cloned().map(VoteableRecord::Comment),
            VoteTarget::User(id) => inner.users.get(&id).cloned().map(VoteableRecord::User),
        };
        record.ok_or_else(|| StoreError::not_found(target.kind().as_str(), target.raw_id()))
    }

    async fn load_sub_ratings_for_user(&self, user: UserId) -> StoreResult<SubRatings> {
        let inner = self.inner.read().await;
        if !inner.users.contains_key(&user) {
            return Err(StoreError::not_found("user", user));
        }

        Ok(SubRatings {
            publication_ratings: inner
                .publications
                .values()
                .filter(|p| p.author == user)
                .map(|p| p.rating)
                .collect(),
            comment_ratings: inner
                .comments
                .values()
                .filter(|c| c.author == user)
                .map(|c| c.rating)
                .collect(),
        })
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let stored = inner
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found("user", user.id))?;
        stored.rating = user.rating;
        stored.authority = user.authority;
        Ok(())
    }

    async fn save_user_rating(&self, user: UserId, rating: f64) -> StoreResult<()> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        inner
            .users
            .get_mut(&user)
            .ok_or_else(|| StoreError::not_found("user", user))?
            .rating = rating;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn users_with_roles(&self, roles: &[Role]) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| roles.contains(&u.role))
            .cloned()
            .collect())
    }

    async fn get_publication(&self, id: PublicationId) -> StoreResult<Publication> {
        self.inner
            .read()
            .await
            .publications
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("publication", id))
    }

    async fn publications_by_author(&self, author: UserId) -> StoreResult<Vec<Publication>> {
        let inner = self.inner.read().await;
        let mut publications: Vec<Publication> = inner
            .publications
            .values()
            .filter(|p| p.author == author)
            .cloned()
            .collect();
        publications.sort_by(|a, b| b.rating.cmp(&a.rating).then(a.id.cmp(&b.id)));
        Ok(publications)
    }

    async fn comments_for_publication(&self, id: PublicationId) -> StoreResult<Vec<Comment>> {
        let inner = self.inner.read().await;
        if !inner.publications.contains_key(&id) {
            return Err(StoreError::not_found("publication", id));
        }
        Ok(inner
            .comments
            .values()
            .filter(|c| c.publication == id)
            .cloned()
            .collect())
    }

    async fn categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.inner.read().await.categories.values().cloned().collect())
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    async fn insert_organization(
        &self,
        founder: UserId,
        new: NewOrganization,
    ) -> StoreResult<Organization> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        if let Some(parent) = new.parent {
            if !inner.organizations.contains_key(&parent) {
                return Err(StoreError::not_found("organization", parent));
            }
        }

        inner.next_organization_id += 1;
        let now = Utc::now();
        let organization = Organization {
            id: OrganizationId(inner.next_organization_id),
            title: new.title,
            slug: new.slug,
            description: new.description,
            founder,
            parent: new.parent,
            employees: Default::default(),
            subscribers: [founder].into_iter().collect(),
            is_active: true,
            found_at: now.date_naive(),
            created_at: now,
        };
        inner
            .organizations
            .insert(organization.id, organization.clone());
        Ok(organization)
    }

    async fn get_organization(&self, id: OrganizationId) -> StoreResult<Organization> {
        self.inner
            .read()
            .await
            .organizations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("organization", id))
    }

    async fn insert_project(
        &self,
        founder: Owner,
        subscriber: UserId,
        new: NewProject,
    ) -> StoreResult<Project> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;

        inner.next_project_id += 1;
        let project = Project {
            id: ProjectId(inner.next_project_id),
            title: new.title,
            slug: new.slug,
            short_description: new.short_description,
            founder,
            members: Default::default(),
            subscribers: [subscriber].into_iter().collect(),
            is_active: true,
            created_at: Utc::now(),
        };
        inner.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: ProjectId) -> StoreResult<Project> {
        self.inner
            .read()
            .await
            .projects
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("project", id))
    }

    async fn add_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let subscribers = match target {
            Subscribable::Organization(id) => {
                &mut inner
                    .organizations
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found("organization", id))?
                    .subscribers
            }
            Subscribable::Project(id) => {
                &mut inner
                    .projects
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found("project", id))?
                    .subscribers
            }
        };
        Ok(subscribers.insert(user))
    }

    async fn remove_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let subscribers = match target {
            Subscribable::Organization(id) => {
                &mut inner
                    .organizations
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found("organization", id))?
                    .subscribers
            }
            Subscribable::Project(id) => {
                &mut inner
                    .projects
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::not_found("project", id))?
                    .subscribers
            }
        };
        Ok(subscribers.remove(&user))
    }

    async fn add_project_member(&self, project: ProjectId, user: UserId) -> StoreResult<bool> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let project = inner
            .projects
            .get_mut(&project)
            .ok_or_else(|| StoreError::not_found("project", project))?;
        Ok(project.members.insert(user))
    }

    async fn add_employee(
        &self,
        organization: OrganizationId,
        user: UserId,
    ) -> StoreResult<bool> {
        self.check_writable()?;
        let mut inner = self.inner.write().await;
        let organization = inner
            .organizations
            .get_mut(&organization)
            .ok_or_else(|| StoreError::not_found("organization", organization))?;
        Ok(organization.employees.insert(user))
    }
}
