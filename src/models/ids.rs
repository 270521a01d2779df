//! Typed primary keys
//!
//! Every persisted record is keyed by a `BIGSERIAL` in PostgreSQL. The
//! newtypes keep a comment id from being passed where a publication id is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Key of a registered user
    UserId
);
define_id!(
    /// Key of a publication
    PublicationId
);
define_id!(
    /// Key of a comment
    CommentId
);
define_id!(CategoryId);
define_id!(OrganizationId);
define_id!(ProjectId);
