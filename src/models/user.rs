//! Users and roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::owner::{Owned, Owner};
use super::vote::VoteTarget;
use super::voteable::{Voteable, VoteableRef};

/// Group a user belongs to. Users without a group read only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Reader,
    Author,
    Moderator,
    Admin,
}

impl Role {
    /// Roles whose ratings are maintained by the user-rating sweep
    pub const ELEVATED: [Role; 3] = [Role::Author, Role::Moderator, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Author => "author",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reader" => Some(Role::Reader),
            "author" => Some(Role::Author),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_elevated(self) -> bool {
        Self::ELEVATED.contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,

    /// Moderator-assigned standing, independent of votes
    pub authority: f64,

    /// Composite rating written by the user-rating sweep
    pub rating: f64,

    /// Sum of votes cast directly on this user
    pub vote_rating: i64,

    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            role,
            authority: 0.0,
            rating: 0.0,
            vote_rating: 0,
            is_verified: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_authority(mut self, authority: f64) -> Self {
        self.authority = authority;
        self
    }
}

impl Owned for User {
    fn owner(&self) -> Owner {
        Owner::User(self.id)
    }
}

impl Voteable for User {
    fn vote_target(&self) -> VoteTarget {
        VoteTarget::User(self.id)
    }

    fn rating(&self) -> i64 {
        self.vote_rating
    }

    fn set_rating(&mut self, rating: i64) {
        self.vote_rating = rating;
    }

    fn as_record(&self) -> VoteableRef<'_> {
        VoteableRef::User(self)
    }
}
