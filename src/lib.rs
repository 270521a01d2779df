//! Nestor
//!
//! Rating aggregation and best comment thread selection for a publishing
//! platform of publications, comments, users, organizations and projects.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs        - Crate root with re-exports
//! ├── main.rs       - Server entrypoint
//! ├── config.rs     - Environment-driven configuration
//! ├── models/       - Ids, votes, content, users and roles, communities
//! ├── rating/       - Rating core
//! │   ├── aggregator.rs  - Vote summation and user rating sweep
//! │   ├── weights.rs     - User rating formula
//! │   ├── thread.rs      - Best comment thread
//! │   └── eligibility.rs - Who may vote on what
//! ├── community.rs  - Organizations, projects, subscriptions
//! ├── database/     - Store traits, PostgreSQL repositories, in-memory store
//! └── api/          - HTTP endpoints and middleware
//! ```

pub mod api;
pub mod community;
pub mod config;
pub mod database;
pub mod models;
pub mod rating;

// Re-export main types for convenience
pub use community::{CommunityError, CommunityService};
pub use config::NestorConfig;
pub use database::{DatabasePool, MemoryStore, Store, StoreError};
pub use models::{
    Comment, Publication, Role, User, UserId, Vote, VoteTarget, VoteValue, Voteable,
};
pub use rating::{
    select_best_thread, CommentThread, RatingAggregator, RatingError, RatingWeights,
    VoteRejection, VotingPolicy,
};
