//! Persistence
//!
//! PostgreSQL repositories behind `DatabasePool`, plus `MemoryStore` for
//! running without a database. Both implement the `Store` seam.

pub mod community;
pub mod content;
pub mod memory;
pub mod pool;
pub mod store;
pub mod votes;

pub use community::CommunityRepository;
pub use content::ContentRepository;
pub use memory::MemoryStore;
pub use pool::DatabasePool;
pub use store::{
    CommunityStore, ContentStore, Store, StoreError, StoreResult, SubRatings, VoteStore,
};
pub use votes::VoteRepository;
