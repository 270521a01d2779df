//! Rating Aggregator - recomputes denormalized ratings from votes
//!
//! Ratings are caches: every recalculation re-sums the full vote set (or the
//! full set of sub-ratings for users), so repeated runs over unchanged data
//! converge on the same value. A recalculated value only replaces the
//! caller's copy after the store accepted the write.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::database::{ContentStore, Store, VoteStore};
use crate::models::{Role, User, UserId, Vote, VoteTarget, VoteValue, Voteable};
use crate::rating::{RatingError, RatingWeights};

/// Sum of signed vote values; 0 for no votes
pub fn sum_votes(votes: &[Vote]) -> i64 {
    votes.iter().map(|v| v.value.signed()).sum()
}

/// Result of a vote attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteOutcome {
    /// The stored vote; for a repeat attempt this is the original one
    pub vote: Vote,
    pub created: bool,
    /// Target rating after the attempt
    pub rating: i64,
}

impl VoteOutcome {
    pub fn already_voted(&self) -> bool {
        !self.created
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub users_updated: usize,
    pub ratings: Vec<(UserId, f64)>,
}

pub struct RatingAggregator {
    store: Arc<dyn Store>,
    weights: RatingWeights,
    sweep_roles: Vec<Role>,
    /// Shared by vote acceptance, exclusive for the sweep and authority
    /// changes, so a sweep never sums ratings while a vote is half applied
    /// and never writes over a fresh authority
    sweep_gate: RwLock<()>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn Store>, weights: RatingWeights) -> Self {
        Self {
            store,
            weights,
            sweep_roles: Role::ELEVATED.to_vec(),
            sweep_gate: RwLock::new(()),
        }
    }

    pub fn with_sweep_roles(mut self, roles: Vec<Role>) -> Self {
        self.sweep_roles = roles;
        self
    }

    pub fn weights(&self) -> &RatingWeights {
        &self.weights
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Sum `votes` into `target`'s rating and persist it.
    ///
    /// `votes` must be exactly the votes cast on `target`; they are not
    /// filtered here. On a failed write `target` keeps its previous rating.
    pub async fn recalculate_rating<T>(&self, target: &mut T, votes: &[Vote]) -> Result<i64, RatingError>
    where
        T: Voteable + Clone + Send + Sync,
    {
        let new_rating = sum_votes(votes);

        let mut updated = target.clone();
        updated.set_rating(new_rating);

        if let Err(source) = self.store.save_voteable(updated.as_record()).await {
            error!(
                target = %updated.vote_target(),
                error = %source,
                "Failed to persist recalculated rating"
            );
            return Err(RatingError::Persistence {
                target: updated.vote_target(),
                source,
            });
        }

        debug!(
            target = %updated.vote_target(),
            previous = target.rating(),
            rating = new_rating,
            votes = votes.len(),
            "Recalculated rating"
        );

        *target = updated;
        Ok(new_rating)
    }

    /// Re-sum every stored vote on `target` into its cached rating. The
    /// store does the sum and the write as one step, so concurrent refreshes
    /// of the same target cannot leave an older sum behind.
    pub async fn refresh_rating(&self, target: VoteTarget) -> Result<i64, RatingError> {
        match self.store.recount_rating(target).await {
            Ok(rating) => {
                debug!(target = %target, rating = rating, "Refreshed rating");
                Ok(rating)
            }
            Err(e) if e.is_not_found() => Err(e.into()),
            Err(source) => {
                error!(target = %target, error = %source, "Failed to persist refreshed rating");
                Err(RatingError::Persistence { target, source })
            }
        }
    }

    /// Record a vote and refresh the target's rating.
    ///
    /// A repeat vote by the same voter leaves the stored vote and the rating
    /// alone and reports `already_voted`. Self-vote and standing checks are
    /// the caller's job.
    pub async fn cast_vote(
        &self,
        voter: UserId,
        target: VoteTarget,
        value: VoteValue,
    ) -> Result<VoteOutcome, RatingError> {
        let _gate = self.sweep_gate.read().await;
        let (vote, created) = self.store.create_vote_if_absent(voter, target, value).await?;

        if !created {
            let rating = self.store.load_voteable(target).await?.rating();
            info!(
                voter = %voter,
                target = %target,
                "Voter already voted on target, ignoring"
            );
            return Ok(VoteOutcome {
                vote,
                created,
                rating,
            });
        }

        let rating = self.refresh_rating(target).await?;
        info!(
            voter = %voter,
            target = %target,
            value = value.signed(),
            rating = rating,
            "Vote accepted"
        );

        Ok(VoteOutcome {
            vote,
            created,
            rating,
        })
    }

    async fn user_rating_for(&self, user: &User) -> Result<f64, RatingError> {
        let sub = self.store.load_sub_ratings_for_user(user.id).await?;
        let rating = self.weights.user_rating(user.authority, &sub);
        debug!(
            user_id = %user.id,
            authority = user.authority,
            publications = sub.publication_ratings.len(),
            comments = sub.comment_ratings.len(),
            rating = rating,
            "Computed user rating"
        );
        Ok(rating)
    }

    /// Recompute one user's composite rating from authority and the
    /// current ratings of everything they authored. Only the rating is
    /// written back.
    pub async fn recalculate_user_rating(&self, user: &mut User) -> Result<f64, RatingError> {
        let new_rating = self.user_rating_for(user).await?;

        if let Err(source) = self.store.save_user_rating(user.id, new_rating).await {
            error!(user_id = %user.id, error = %source, "Failed to persist user rating");
            return Err(RatingError::Persistence {
                target: VoteTarget::User(user.id),
                source,
            });
        }

        user.rating = new_rating;
        Ok(new_rating)
    }

    /// Batch sweep over every user holding one of the sweep roles.
    ///
    /// Users are processed one at a time; the first failure stops the sweep
    /// and is returned. Users already written keep their new rating.
    pub async fn recalculate_user_ratings(&self) -> Result<SweepReport, RatingError> {
        let _gate = self.sweep_gate.write().await;
        let users = self.store.users_with_roles(&self.sweep_roles).await?;
        info!(users = users.len(), "Starting user rating sweep");

        let mut report = SweepReport::default();
        for mut user in users {
            let rating = self.recalculate_user_rating(&mut user).await?;
            report.users_updated += 1;
            report.ratings.push((user.id, rating));
        }

        info!(users_updated = report.users_updated, "User rating sweep finished");
        Ok(report)
    }

    /// Moderation action: assign a new authority and rewrite the user's
    /// rating in the same write. Excludes a running sweep.
    pub async fn assign_authority(&self, user_id: UserId, authority: f64) -> Result<User, RatingError> {
        let _gate = self.sweep_gate.write().await;
        let mut user = self.store.get_user(user_id).await?;
        let previous = user.authority;

        user.authority = authority;
        user.rating = self.user_rating_for(&user).await?;

        if let Err(source) = self.store.save_user(&user).await {
            error!(user_id = %user_id, error = %source, "Failed to persist authority");
            return Err(RatingError::Persistence {
                target: VoteTarget::User(user_id),
                source,
            });
        }

        info!(
            user_id = %user_id,
            previous = previous,
            authority = authority,
            rating = user.rating,
            "Assigned authority"
        );
        Ok(user)
    }
}
