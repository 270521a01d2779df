//! Votes and vote targets
//!
//! A vote is an immutable `(voter, target, value)` triple. The store keeps at
//! most one vote per `(voter, target)` pair; a second attempt returns the
//! existing record instead of replacing it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{CommentId, PublicationId, UserId};

/// Signed unit value of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Like,
    Unlike,
}

impl VoteValue {
    /// Contribution to the target's rating (+1 or -1)
    pub fn signed(self) -> i64 {
        match self {
            VoteValue::Like => 1,
            VoteValue::Unlike => -1,
        }
    }

    pub fn from_signed(value: i64) -> Option<Self> {
        match value {
            1 => Some(VoteValue::Like),
            -1 => Some(VoteValue::Unlike),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteValue::Like => "like",
            VoteValue::Unlike => "unlike",
        }
    }
}

/// Voice string from the request path was neither `like` nor `unlike`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown voice '{0}', expected 'like' or 'unlike'")]
pub struct UnknownVoice(pub String);

impl FromStr for VoteValue {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(VoteValue::Like),
            "unlike" => Ok(VoteValue::Unlike),
            other => Err(UnknownVoice(other.to_string())),
        }
    }
}

/// Kind tag used by storage to key the single votes table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Publication,
    Comment,
    User,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Publication => "publication",
            TargetKind::Comment => "comment",
            TargetKind::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "publication" => Some(TargetKind::Publication),
            "comment" => Some(TargetKind::Comment),
            "user" => Some(TargetKind::User),
            _ => None,
        }
    }
}

/// Anything a vote can be cast on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    Publication(PublicationId),
    Comment(CommentId),
    User(UserId),
}

impl VoteTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            VoteTarget::Publication(_) => TargetKind::Publication,
            VoteTarget::Comment(_) => TargetKind::Comment,
            VoteTarget::User(_) => TargetKind::User,
        }
    }

    /// Raw key, meaningful only together with `kind()`
    pub fn raw_id(&self) -> i64 {
        match self {
            VoteTarget::Publication(id) => id.0,
            VoteTarget::Comment(id) => id.0,
            VoteTarget::User(id) => id.0,
        }
    }

    pub fn from_parts(kind: TargetKind, id: i64) -> Self {
        match kind {
            TargetKind::Publication => VoteTarget::Publication(PublicationId(id)),
            TargetKind::Comment => VoteTarget::Comment(CommentId(id)),
            TargetKind::User => VoteTarget::User(UserId(id)),
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.raw_id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: UserId,
    pub target: VoteTarget,
    pub value: VoteValue,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(voter: UserId, target: VoteTarget, value: VoteValue) -> Self {
        Self {
            voter,
            target,
            value,
            created_at: Utc::now(),
        }
    }
}
