//! Domain records shared by the rating core, storage and the HTTP layer

pub mod community;
pub mod content;
pub mod ids;
pub mod owner;
pub mod user;
pub mod vote;
pub mod voteable;

pub use community::{NewOrganization, NewProject, Organization, Project, Subscribable};
pub use content::{Category, Comment, Publication};
pub use ids::{CategoryId, CommentId, OrganizationId, ProjectId, PublicationId, UserId};
pub use owner::{Owned, Owner};
pub use user::{Role, User};
pub use vote::{TargetKind, UnknownVoice, Vote, VoteTarget, VoteValue};
pub use voteable::{Voteable, VoteableRecord, VoteableRef};
