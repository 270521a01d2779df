//! Publications, comments and categories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CategoryId, CommentId, OrganizationId, PublicationId, UserId};
use super::owner::{Owned, Owner};
use super::vote::VoteTarget;
use super::voteable::{Voteable, VoteableRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: PublicationId,
    pub title: String,
    pub short_description: String,
    pub author: UserId,
    pub organization: Option<OrganizationId>,
    pub categories: Vec<CategoryId>,
    pub rating: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Publication {
    pub fn new(id: PublicationId, author: UserId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            short_description: String::new(),
            author,
            organization: None,
            categories: Vec::new(),
            rating: 0,
            is_published: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Owned for Publication {
    fn owner(&self) -> Owner {
        Owner::User(self.author)
    }
}

impl Voteable for Publication {
    fn vote_target(&self) -> VoteTarget {
        VoteTarget::Publication(self.id)
    }

    fn rating(&self) -> i64 {
        self.rating
    }

    fn set_rating(&mut self, rating: i64) {
        self.rating = rating;
    }

    fn as_record(&self) -> VoteableRef<'_> {
        VoteableRef::Publication(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub publication: PublicationId,
    pub author: UserId,

    /// Comment this one replies to; `None` for thread roots
    pub parent: Option<CommentId>,

    pub body: String,
    pub rating: i64,

    /// Soft-deleted comments keep their place in the tree
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        id: CommentId,
        publication: PublicationId,
        author: UserId,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id,
            publication,
            author,
            parent: None,
            body: body.into(),
            rating: 0,
            is_deleted: false,
            created_at: Utc::now(),
        }
    }

    pub fn reply_to(mut self, parent: CommentId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// First 75 characters of the body, with an ellipsis when cut
    pub fn excerpt(&self) -> String {
        let mut chars = self.body.chars();
        let head: String = chars.by_ref().take(75).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

impl Owned for Comment {
    fn owner(&self) -> Owner {
        Owner::User(self.author)
    }
}

impl Voteable for Comment {
    fn vote_target(&self) -> VoteTarget {
        VoteTarget::Comment(self.id)
    }

    fn rating(&self) -> i64 {
        self.rating
    }

    fn set_rating(&mut self, rating: i64) {
        self.rating = rating;
    }

    fn as_record(&self) -> VoteableRef<'_> {
        VoteableRef::Comment(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub slug: String,
    pub author: UserId,
}
