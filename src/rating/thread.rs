//! Best comment thread
//!
//! Picks the top-rated comment of a publication and walks its parent links
//! inside the supplied collection up to the thread root. Equal ratings go to
//! the earliest comment, then the lowest id, so the result never depends on
//! the order rows came back from storage.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::models::{Comment, CommentId};

/// Root-first chain ending at the best comment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentThread<'a> {
    chain: Vec<&'a Comment>,

    /// The walk stopped before a root: a parent was missing from the
    /// collection or the parent links looped
    truncated: bool,
}

impl<'a> CommentThread<'a> {
    pub fn comments(&self) -> &[&'a Comment] {
        &self.chain
    }

    /// Top-rated comment, last in the chain
    pub fn best(&self) -> &'a Comment {
        self.chain[self.chain.len() - 1]
    }

    /// Topmost resolvable ancestor
    pub fn root(&self) -> &'a Comment {
        self.chain[0]
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn ids(&self) -> Vec<CommentId> {
        self.chain.iter().map(|c| c.id).collect()
    }

    pub fn to_owned_comments(&self) -> Vec<Comment> {
        self.chain.iter().map(|c| (*c).clone()).collect()
    }
}

/// Order by rating, then earlier creation, then lower id
fn rank(a: &Comment, b: &Comment) -> Ordering {
    a.rating
        .cmp(&b.rating)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Returns `None` when there is no live comment to build a thread from.
/// Deleted comments never win but still link a thread together.
pub fn select_best_thread(comments: &[Comment]) -> Option<CommentThread<'_>> {
    let best = comments
        .iter()
        .filter(|c| !c.is_deleted)
        .max_by(|a, b| rank(a, b))?;

    let by_id: HashMap<CommentId, &Comment> = comments.iter().map(|c| (c.id, c)).collect();

    let mut chain = vec![best];
    let mut seen = HashSet::from([best.id]);
    let mut truncated = false;
    let mut current = best;

    while let Some(parent_id) = current.parent {
        match by_id.get(&parent_id) {
            Some(parent) if seen.insert(parent.id) => {
                chain.push(*parent);
                current = *parent;
            }
            Some(_) => {
                warn!(
                    comment_id = %current.id,
                    parent_id = %parent_id,
                    "Comment parent links form a cycle, stopping thread walk"
                );
                truncated = true;
                break;
            }
            None => {
                debug!(
                    comment_id = %current.id,
                    parent_id = %parent_id,
                    "Parent comment not in collection, stopping thread walk"
                );
                truncated = true;
                break;
            }
        }
    }

    chain.reverse();
    Some(CommentThread { chain, truncated })
}
