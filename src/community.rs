//! Organizations and projects
//!
//! Founding an organization or a project subscribes the founding user in
//! the same store write as the insert. A project founded by an organization
//! subscribes that organization's founder.

use std::sync::Arc;
use tracing::info;

use crate::database::{CommunityStore, ContentStore, Store, StoreError};
use crate::models::{
    NewOrganization, NewProject, Organization, OrganizationId, Owned, Owner, Project, ProjectId,
    Subscribable, UserId,
};

#[derive(Debug, thiserror::Error)]
pub enum CommunityError {
    #[error("user {user} does not own organization {organization}")]
    NotOrganizationOwner {
        user: UserId,
        organization: OrganizationId,
    },

    #[error("user {user} cannot manage {target}")]
    NotManager { user: UserId, target: String },

    #[error("{0} is no longer active")]
    Inactive(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct CommunityService {
    store: Arc<dyn Store>,
}

impl CommunityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn found_organization(
        &self,
        founder: UserId,
        new: NewOrganization,
    ) -> Result<Organization, CommunityError> {
        self.store.get_user(founder).await?;

        let organization = self.store.insert_organization(founder, new).await?;

        info!(
            organization_id = %organization.id,
            founder = %founder,
            slug = %organization.slug,
            "Founded organization"
        );
        Ok(organization)
    }

    /// Found a project for the acting user, or for one of their
    /// organizations when `new.organization` is set
    pub async fn found_project(
        &self,
        actor: UserId,
        new: NewProject,
    ) -> Result<Project, CommunityError> {
        let (founder, subscriber) = match new.organization {
            Some(organization_id) => {
                let organization = self.store.get_organization(organization_id).await?;
                if !organization.is_owned_by(actor) {
                    return Err(CommunityError::NotOrganizationOwner {
                        user: actor,
                        organization: organization_id,
                    });
                }
                (Owner::Organization(organization_id), organization.founder)
            }
            None => {
                self.store.get_user(actor).await?;
                (Owner::User(actor), actor)
            }
        };

        let project = self.store.insert_project(founder, subscriber, new).await?;

        info!(
            project_id = %project.id,
            founder = ?founder,
            slug = %project.slug,
            "Founded project"
        );
        Ok(project)
    }

    /// Returns false when the user was already subscribed
    pub async fn subscribe(&self, target: Subscribable, user: UserId) -> Result<bool, CommunityError> {
        self.ensure_active(target).await?;
        let added = self.store.add_subscriber(target, user).await?;
        info!(target = ?target, user = %user, added = added, "Subscribe");
        Ok(added)
    }

    /// Returns false when the user was not subscribed
    pub async fn unsubscribe(&self, target: Subscribable, user: UserId) -> Result<bool, CommunityError> {
        let removed = self.store.remove_subscriber(target, user).await?;
        info!(target = ?target, user = %user, removed = removed, "Unsubscribe");
        Ok(removed)
    }

    pub async fn add_member(&self, project: ProjectId, user: UserId) -> Result<bool, CommunityError> {
        self.ensure_active(Subscribable::Project(project)).await?;
        self.store.get_user(user).await?;
        Ok(self.store.add_project_member(project, user).await?)
    }

    pub async fn add_employee(
        &self,
        organization: OrganizationId,
        user: UserId,
    ) -> Result<bool, CommunityError> {
        self.ensure_active(Subscribable::Organization(organization))
            .await?;
        self.store.get_user(user).await?;
        Ok(self.store.add_employee(organization, user).await?)
    }

    /// Organizations are managed by their founder; projects by their
    /// founding user or by the founder of their founding organization
    pub async fn ensure_manager(&self, actor: UserId, target: Subscribable) -> Result<(), CommunityError> {
        let manager = match target {
            Subscribable::Organization(id) => self.store.get_organization(id).await?.founder,
            Subscribable::Project(id) => match self.store.get_project(id).await?.founder {
                Owner::User(user) => user,
                Owner::Organization(org) => self.store.get_organization(org).await?.founder,
            },
        };

        if manager == actor {
            Ok(())
        } else {
            Err(CommunityError::NotManager {
                user: actor,
                target: label(target),
            })
        }
    }

    async fn ensure_active(&self, target: Subscribable) -> Result<(), CommunityError> {
        let active = match target {
            Subscribable::Organization(id) => self.store.get_organization(id).await?.is_active,
            Subscribable::Project(id) => self.store.get_project(id).await?.is_active,
        };

        if active {
            Ok(())
        } else {
            Err(CommunityError::Inactive(label(target)))
        }
    }
}

fn label(target: Subscribable) -> String {
    match target {
        Subscribable::Organization(id) => format!("organization {}", id),
        Subscribable::Project(id) => format!("project {}", id),
    }
}
