//! Staff dashboard read model, built per request from the repositories.

use crate::catalog::CatalogKind;
use crate::environment::{Clock, SiteCalendar};
use crate::error::BookingError;
use crate::repository::{
    BookingRepository, BookingStats, CatalogRepository, ReviewRepository, ReviewStats,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Items needing staff attention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NotificationCounts {
    /// Pending bookings created in the last 7 days
    pub new_bookings: u64,
    /// Reviews awaiting moderation
    pub pending_reviews: u64,
    /// Sum of the above
    pub total: u64,
}

/// Dashboard snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Booking counts and revenue
    pub bookings: BookingStats,
    /// Review counts
    pub reviews: ReviewStats,
    /// Active items per kind
    pub content: BTreeMap<CatalogKind, u64>,
    /// Attention counters
    pub notifications: NotificationCounts,
}

/// Computes the dashboard.
#[derive(Clone)]
pub struct DashboardService {
    bookings: Arc<dyn BookingRepository>,
    reviews: Arc<dyn ReviewRepository>,
    catalog: Arc<dyn CatalogRepository>,
    clock: Arc<dyn Clock>,
    calendar: SiteCalendar,
}

impl DashboardService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        reviews: Arc<dyn ReviewRepository>,
        catalog: Arc<dyn CatalogRepository>,
        clock: Arc<dyn Clock>,
        calendar: SiteCalendar,
    ) -> Self {
        Self {
            bookings,
            reviews,
            catalog,
            clock,
            calendar,
        }
    }

    /// Current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] on storage failure.
    pub async fn snapshot(&self) -> Result<Dashboard, BookingError> {
        let window = self.calendar.window(self.clock.now());
        let (bookings, reviews, content) = futures::try_join!(
            self.bookings.stats(window),
            self.reviews.stats(window),
            self.catalog.count_active(),
        )?;
        let notifications = NotificationCounts {
            new_bookings: bookings.new_pending,
            pending_reviews: reviews.pending,
            total: bookings.new_pending + reviews.pending,
        };
        Ok(Dashboard {
            bookings,
            reviews,
            content,
            notifications,
        })
    }
}
