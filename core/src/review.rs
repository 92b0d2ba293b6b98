//! Customer reviews and rating aggregation.

use crate::catalog::CatalogRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest rating shown to customers. Approved reviews below it stay hidden.
pub const MIN_VISIBLE_RATING: u8 = 4;

/// Database id of a review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(i64);

impl ReviewId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Database id
    pub id: ReviewId,
    /// Reviewed item
    pub target: CatalogRef,
    /// Author name
    pub name: String,
    /// Author e-mail, never shown publicly
    #[serde(skip_serializing)]
    pub email: String,
    /// 1 to 5
    pub rating: u8,
    /// Headline
    pub title: String,
    /// Body
    pub comment: String,
    /// Moderation flag
    pub is_approved: bool,
    /// Submission time
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Whether customers may see this review.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.is_approved && self.rating >= MIN_VISIBLE_RATING
    }
}

/// A review about to be inserted. Always stored unapproved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReview {
    /// Reviewed item
    pub target: CatalogRef,
    /// Author name
    pub name: String,
    /// Author e-mail
    pub email: String,
    /// 1 to 5
    pub rating: u8,
    /// Headline
    pub title: String,
    /// Body
    pub comment: String,
}

/// Count and average over the visible reviews of one item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Number of visible reviews
    pub count: u64,
    /// Mean rating, `None` when there are no visible reviews
    pub average: Option<f64>,
}

impl RatingSummary {
    /// Aggregates the given ratings.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let (count, sum) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(n, s), r| (n + 1, s + u64::from(r)));
        Self::from_totals(count, sum)
    }

    /// Builds a summary from a count and a rating sum.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_totals(count: u64, sum: u64) -> Self {
        if count == 0 {
            return Self::default();
        }
        Self {
            count,
            average: Some(sum as f64 / count as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ratings_means_no_average() {
        let summary = RatingSummary::from_ratings([]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, None);
    }

    #[test]
    fn averages_visible_ratings() {
        let summary = RatingSummary::from_ratings([4, 5, 5, 4]);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.average, Some(4.5));
    }

    #[test]
    fn rating_three_is_hidden_even_when_approved() {
        let review = Review {
            id: ReviewId::new(1),
            target: CatalogRef::Tour(1),
            name: "Anna".to_string(),
            email: "anna@example.com".to_string(),
            rating: 3,
            title: "Okay".to_string(),
            comment: "Fine".to_string(),
            is_approved: true,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        assert!(!review.is_visible());
        assert!(Review { rating: 4, ..review.clone() }.is_visible());
        assert!(!Review { rating: 5, is_approved: false, ..review }.is_visible());
    }
}
