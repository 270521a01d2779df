//! Organizations and projects
//!
//! Both aggregate users through subscriber and membership sets. Sets are
//! ordered so responses and storage writes are deterministic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ids::{OrganizationId, ProjectId, UserId};
use super::owner::{Owned, Owner};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub founder: UserId,
    pub parent: Option<OrganizationId>,
    pub employees: BTreeSet<UserId>,
    pub subscribers: BTreeSet<UserId>,
    pub is_active: bool,
    pub found_at: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Owned for Organization {
    fn owner(&self) -> Owner {
        Owner::User(self.founder)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub slug: String,
    pub short_description: String,

    /// A project is founded either by a user or by an organization
    pub founder: Owner,

    pub members: BTreeSet<UserId>,
    pub subscribers: BTreeSet<UserId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Owned for Project {
    fn owner(&self) -> Owner {
        self.founder
    }
}

/// Fields supplied when founding an organization
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<OrganizationId>,
}

/// Fields supplied when founding a project
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub short_description: String,
    /// Found on behalf of an organization instead of the acting user
    #[serde(default)]
    pub organization: Option<OrganizationId>,
}

/// Something a user can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subscribable {
    Organization(OrganizationId),
    Project(ProjectId),
}
