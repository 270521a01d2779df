//! Rating subsystem
//!
//! Keeps the denormalized ratings on publications, comments and users in
//! step with the votes behind them, and picks the best comment thread of a
//! publication.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ VotingPolicy │────►│ RatingAggregator │────►│ Store        │
//! │ (handlers)   │     │ (recalculation)  │     │ (pg / memory)│
//! └──────────────┘     └──────────────────┘     └──────────────┘
//!                               │
//!                               ▼
//!                      ┌──────────────────┐
//!                      │ RatingWeights    │
//!                      │ (user formula)   │
//!                      └──────────────────┘
//!
//! select_best_thread: pure, over comments already loaded
//! ```
//!
//! ## Rating Model
//!
//! - Publication and comment ratings are the sum of their votes (+1/-1)
//! - Votes on a user sum into `User::vote_rating`
//! - `User::rating` is recomputed by a sweep over elevated users:
//!   `authority * A + sum(publication ratings) * P + sum(comment ratings) * C`

mod aggregator;
mod eligibility;
mod error;
mod thread;
mod weights;

pub use aggregator::{sum_votes, RatingAggregator, SweepReport, VoteOutcome};
pub use eligibility::{VoteRejection, VotingPolicy};
pub use error::RatingError;
pub use thread::{select_best_thread, CommentThread};
pub use weights::RatingWeights;
