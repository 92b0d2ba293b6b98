//! Review submission and moderation.

use super::resolve_active;
use crate::catalog::{CatalogItem, Reviewable};
use crate::error::BookingError;
use crate::metrics::REVIEWS_SUBMITTED_TOTAL;
use crate::repository::{CatalogRepository, ReviewRepository};
use crate::review::{Review, ReviewId};
use crate::validation::{FieldErrors, ReviewForm};
use std::sync::Arc;

/// Outcome of a submission whose target exists.
#[derive(Clone, Debug, PartialEq)]
pub enum ReviewSubmission {
    /// Stored, awaiting moderation
    Accepted {
        /// Reviewed item
        item: CatalogItem,
        /// Stored review
        review: Review,
    },
    /// Not stored
    Rejected {
        /// Reviewed item
        item: CatalogItem,
        /// Field messages
        errors: FieldErrors,
    },
}

impl ReviewSubmission {
    /// The reviewed item, for redirecting back to its page.
    #[must_use]
    pub const fn item(&self) -> &CatalogItem {
        match self {
            Self::Accepted { item, .. } | Self::Rejected { item, .. } => item,
        }
    }
}

/// Accepts reviews and lets staff moderate them.
#[derive(Clone)]
pub struct ReviewService {
    catalog: Arc<dyn CatalogRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl ReviewService {
    /// Creates the service.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, reviews: Arc<dyn ReviewRepository>) -> Self {
        Self { catalog, reviews }
    }

    /// Resolves the target, validates the form and stores the review unapproved.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] if the target reference itself is unusable
    /// - [`BookingError::NotFound`] if the target does not exist or is inactive
    /// - [`BookingError::Store`] on storage failure
    pub async fn submit(&self, form: &ReviewForm) -> Result<ReviewSubmission, BookingError> {
        let target = form.target().ok_or_else(|| {
            FieldErrors::single("object_id", "Unknown review target.")
        })?;
        let item = resolve_active(self.catalog.as_ref(), target).await?;

        let new_review = match form.validate(item.review_target()) {
            Ok(review) => review,
            Err(errors) => return Ok(ReviewSubmission::Rejected { item, errors }),
        };
        let review = self.reviews.insert(new_review).await?;

        metrics::counter!(REVIEWS_SUBMITTED_TOTAL).increment(1);
        tracing::info!(review_id = %review.id, item = %review.target, rating = review.rating, "review stored for moderation");
        Ok(ReviewSubmission::Accepted { item, review })
    }

    /// Reviews awaiting moderation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] on storage failure.
    pub async fn pending(&self, limit: u32) -> Result<Vec<Review>, BookingError> {
        Ok(self.reviews.pending(limit).await?)
    }

    /// Approves a review.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for unknown ids.
    pub async fn approve(&self, id: ReviewId) -> Result<Review, BookingError> {
        let review = self
            .reviews
            .approve(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("review {id} does not exist")))?;
        tracing::info!(review_id = %id, "review approved");
        Ok(review)
    }

    /// Deletes a review.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for unknown ids.
    pub async fn delete(&self, id: ReviewId) -> Result<(), BookingError> {
        if self.reviews.delete(id).await? {
            tracing::info!(review_id = %id, "review deleted");
            Ok(())
        } else {
            Err(BookingError::NotFound(format!("review {id} does not exist")))
        }
    }
}
