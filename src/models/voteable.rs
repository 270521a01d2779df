//! Voteable entities
//!
//! Publications, comments and users carry a rating derived from the votes
//! cast on them. `VoteableRef` is the tagged form handed to storage when the
//! recalculated entity is saved.

use serde::Serialize;

use super::content::{Comment, Publication};
use super::owner::{Owned, Owner};
use super::user::User;
use super::vote::VoteTarget;

pub trait Voteable {
    fn vote_target(&self) -> VoteTarget;

    /// Rating derived from votes on this entity
    fn rating(&self) -> i64;

    fn set_rating(&mut self, rating: i64);

    fn as_record(&self) -> VoteableRef<'_>;
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum VoteableRef<'a> {
    Publication(&'a Publication),
    Comment(&'a Comment),
    User(&'a User),
}

impl VoteableRef<'_> {
    pub fn vote_target(&self) -> VoteTarget {
        match self {
            VoteableRef::Publication(p) => p.vote_target(),
            VoteableRef::Comment(c) => c.vote_target(),
            VoteableRef::User(u) => u.vote_target(),
        }
    }
}

/// Owned counterpart of `VoteableRef`, returned when a target is loaded by key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "lowercase")]
pub enum VoteableRecord {
    Publication(Publication),
    Comment(Comment),
    User(User),
}

impl Voteable for VoteableRecord {
    fn vote_target(&self) -> VoteTarget {
        match self {
            VoteableRecord::Publication(p) => p.vote_target(),
            VoteableRecord::Comment(c) => c.vote_target(),
            VoteableRecord::User(u) => u.vote_target(),
        }
    }

    fn rating(&self) -> i64 {
        match self {
            VoteableRecord::Publication(p) => p.rating(),
            VoteableRecord::Comment(c) => c.rating(),
            VoteableRecord::User(u) => u.rating(),
        }
    }

    fn set_rating(&mut self, rating: i64) {
        match self {
            VoteableRecord::Publication(p) => p.set_rating(rating),
            VoteableRecord::Comment(c) => c.set_rating(rating),
            VoteableRecord::User(u) => u.set_rating(rating),
        }
    }

    fn as_record(&self) -> VoteableRef<'_> {
        match self {
            VoteableRecord::Publication(p) => VoteableRef::Publication(p),
            VoteableRecord::Comment(c) => VoteableRef::Comment(c),
            VoteableRecord::User(u) => VoteableRef::User(u),
        }
    }
}

impl Owned for VoteableRecord {
    fn owner(&self) -> Owner {
        match self {
            VoteableRecord::Publication(p) => p.owner(),
            VoteableRecord::Comment(c) => c.owner(),
            VoteableRecord::User(u) => u.owner(),
        }
    }
}
