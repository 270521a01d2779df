//! Vote eligibility
//!
//! Checked by request handlers before a vote reaches the aggregator. The
//! aggregator itself trusts that self-votes and low-standing voters were
//! already turned away.

use serde::{Deserialize, Serialize};

use crate::models::{Owned, TargetKind, User, Voteable, VoteableRecord};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VoteRejection {
    #[error("cannot vote on your own {0}")]
    SelfVote(&'static str),

    #[error("rating {rating} is below the {required} required to vote on comments")]
    InsufficientStanding { rating: f64, required: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VotingPolicy {
    /// Lowest voter rating still allowed to vote on comments
    pub min_comment_voter_rating: f64,
}

impl Default for VotingPolicy {
    fn default() -> Self {
        Self {
            min_comment_voter_rating: -15.0,
        }
    }
}

impl VotingPolicy {
    pub fn check(&self, voter: &User, target: &VoteableRecord) -> Result<(), VoteRejection> {
        let kind = target.vote_target().kind();

        if target.is_owned_by(voter.id) {
            return Err(VoteRejection::SelfVote(kind.as_str()));
        }

        if kind == TargetKind::Comment && voter.rating < self.min_comment_voter_rating {
            return Err(VoteRejection::InsufficientStanding {
                rating: voter.rating,
                required: self.min_comment_voter_rating,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, CommentId, Publication, PublicationId, Role, UserId};

    fn voter(rating: f64) -> User {
        let mut user = User::new(UserId(2), "reader", Role::Reader);
        user.rating = rating;
        user
    }

    #[test]
    fn test_self_vote_rejected() {
        let policy = VotingPolicy::default();
        let own = VoteableRecord::Publication(Publication::new(PublicationId(1), UserId(2), "Mine"));
        assert_eq!(
            policy.check(&voter(0.0), &own),
            Err(VoteRejection::SelfVote("publication"))
        );

        let me = VoteableRecord::User(voter(0.0));
        assert_eq!(policy.check(&voter(0.0), &me), Err(VoteRejection::SelfVote("user")));
    }

    #[test]
    fn test_low_standing_blocks_comment_votes_only() {
        let policy = VotingPolicy::default();
        let comment = VoteableRecord::Comment(Comment::new(
            CommentId(1),
            PublicationId(1),
            UserId(7),
            "hello",
        ));
        let publication =
            VoteableRecord::Publication(Publication::new(PublicationId(1), UserId(7), "Theirs"));

        assert!(matches!(
            policy.check(&voter(-20.0), &comment),
            Err(VoteRejection::InsufficientStanding { .. })
        ));
        assert!(policy.check(&voter(-20.0), &publication).is_ok());
        assert!(policy.check(&voter(-15.0), &comment).is_ok());
    }
}
