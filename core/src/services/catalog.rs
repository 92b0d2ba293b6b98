//! Storefront reads: listings and item detail pages.

use crate::catalog::{CatalogItem, CatalogKind, Reviewable};
use crate::error::BookingError;
use crate::listing::{ListingQuery, Page};
use crate::money::Money;
use crate::repository::{CatalogRepository, ReviewRepository};
use crate::review::{RatingSummary, Review};
use serde::Serialize;
use std::sync::Arc;

/// Reviews shown on a detail page.
pub const DETAIL_REVIEW_LIMIT: u32 = 10;

/// Detail page read model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemDetail {
    /// The item
    pub item: CatalogItem,
    /// Unit price after discount
    pub unit_price: Money,
    /// Visible review aggregate
    pub rating: RatingSummary,
    /// Newest visible reviews
    pub reviews: Vec<Review>,
}

/// Read-only catalog queries.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl CatalogService {
    /// Creates the service.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, reviews: Arc<dyn ReviewRepository>) -> Self {
        Self { catalog, reviews }
    }

    /// One listing page.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for a page past the last one (page 1 always
    /// exists, possibly empty).
    pub async fn list(&self, query: &ListingQuery) -> Result<Page<CatalogItem>, BookingError> {
        let page = self.catalog.list(query).await?;
        if page.is_out_of_range() {
            return Err(BookingError::NotFound(format!(
                "page {} of {} does not exist",
                query.page, query.kind
            )));
        }
        Ok(page)
    }

    /// An active item with its visible reviews.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] if no active item has this slug.
    pub async fn detail(&self, kind: CatalogKind, slug: &str) -> Result<ItemDetail, BookingError> {
        let item = self
            .catalog
            .find_by_slug(kind, slug)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("{kind} {slug} does not exist")))?;
        let target = item.review_target();
        let rating = self.reviews.rating_summary(target).await?;
        let reviews = self.reviews.visible_for(target, DETAIL_REVIEW_LIMIT).await?;
        Ok(ItemDetail {
            unit_price: item.unit_price(),
            item,
            rating,
            reviews,
        })
    }
}
