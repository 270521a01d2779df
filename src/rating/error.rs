use crate::database::StoreError;
use crate::models::VoteTarget;

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    /// The recalculated value was not written; the caller's copy is unchanged
    #[error("failed to persist rating for {target}: {source}")]
    Persistence {
        target: VoteTarget,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RatingError {
    pub fn is_not_found(&self) -> bool {
        match self {
            RatingError::Persistence { source, .. } | RatingError::Store(source) => {
                source.is_not_found()
            }
        }
    }
}
