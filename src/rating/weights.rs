//! Weights of the composite user rating

use serde::{Deserialize, Serialize};

use crate::database::SubRatings;

/// Configuration constants blending authority, publication ratings and
/// comment ratings into a user's rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingWeights {
    pub authority: f64,
    pub publication: f64,
    pub comment: f64,
}

impl Default for RatingWeights {
    fn default() -> Self {
        Self {
            authority: 1.0,
            publication: 1.0,
            comment: 0.5,
        }
    }
}

impl RatingWeights {
    /// `authority * A + sum(publications) * P + sum(comments) * C`
    pub fn user_rating(&self, authority: f64, sub: &SubRatings) -> f64 {
        let publications: i64 = sub.publication_ratings.iter().sum();
        let comments: i64 = sub.comment_ratings.iter().sum();

        authority * self.authority
            + publications as f64 * self.publication
            + comments as f64 * self.comment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rating_formula() {
        let weights = RatingWeights {
            authority: 2.0,
            publication: 1.0,
            comment: 1.0,
        };
        let sub = SubRatings {
            publication_ratings: vec![3, -1],
            comment_ratings: vec![2],
        };
        assert_eq!(weights.user_rating(10.0, &sub), 24.0);
    }

    #[test]
    fn test_user_without_content_keeps_weighted_authority() {
        let weights = RatingWeights::default();
        assert_eq!(weights.user_rating(4.0, &SubRatings::default()), 4.0);
        assert_eq!(weights.user_rating(0.0, &SubRatings::default()), 0.0);
    }

    #[test]
    fn test_comment_weight_applies_to_sum() {
        let weights = RatingWeights {
            authority: 0.0,
            publication: 0.0,
            comment: 0.5,
        };
        let sub = SubRatings {
            publication_ratings: vec![100],
            comment_ratings: vec![3, 4, -1],
        };
        assert_eq!(weights.user_rating(50.0, &sub), 3.0);
    }
}
