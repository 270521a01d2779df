//! Ownership capability
//!
//! Every owned record answers `owner()` with exactly one variant. Vote
//! eligibility and moderation checks go through this instead of guessing
//! which field holds the owner.

use serde::{Deserialize, Serialize};

use super::ids::{OrganizationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Owner {
    User(UserId),
    Organization(OrganizationId),
}

pub trait Owned {
    fn owner(&self) -> Owner;

    fn is_owned_by(&self, user: UserId) -> bool {
        self.owner() == Owner::User(user)
    }
}
