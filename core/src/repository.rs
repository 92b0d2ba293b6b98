//! Storage ports.
//!
//! Each trait is implemented by `ausflug-postgres` for production and by
//! `ausflug-testing` in memory. Writes that touch several rows are single methods so the
//! implementation can run them in one transaction.

use crate::booking::{Booking, BookingId, BookingStatus, NewBooking};
use crate::catalog::{CatalogItem, CatalogKind, CatalogRef};
use crate::confirmation::ConfirmationCode;
use crate::environment::StatsWindow;
use crate::error::StoreError;
use crate::listing::{ListingQuery, Page};
use crate::money::Money;
use crate::payment::{NewPayment, Payment};
use crate::review::{NewReview, RatingSummary, Review, ReviewId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Unique constraint guarding confirmation codes.
pub const CONFIRMATION_CODE_CONSTRAINT: &str = "bookings_confirmation_code_key";
/// Unique constraint guarding provider payment intents.
pub const PAYMENT_INTENT_CONSTRAINT: &str = "payments_payment_intent_id_key";
/// Primary key of the processed webhook event log.
pub const PROCESSED_EVENT_CONSTRAINT: &str = "processed_webhook_events_pkey";

/// Catalog storage.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Looks up an item by reference, active or not.
    async fn find(&self, item: CatalogRef) -> Result<Option<CatalogItem>, StoreError>;

    /// Looks up an active item by slug.
    async fn find_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItem>, StoreError>;

    /// One page of active items matching `query`.
    async fn list(&self, query: &ListingQuery) -> Result<Page<CatalogItem>, StoreError>;

    /// Number of active items per kind. Kinds without items are present with 0.
    async fn count_active(&self) -> Result<BTreeMap<CatalogKind, u64>, StoreError>;

    /// Stores a new item and returns it with its assigned id. The id of the argument
    /// is ignored.
    async fn insert(&self, item: CatalogItem) -> Result<CatalogItem, StoreError>;
}

/// Booking counts for the staff dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BookingStats {
    /// All bookings
    pub total: u64,
    /// Pending bookings
    pub pending: u64,
    /// Confirmed bookings
    pub confirmed: u64,
    /// Created since local midnight
    pub today: u64,
    /// Created in the last 7 days
    pub last_7_days: u64,
    /// Created in the last 30 days
    pub last_30_days: u64,
    /// Pending bookings created in the last 7 days
    pub new_pending: u64,
    /// Sum of confirmed and completed totals
    pub revenue: Money,
}

/// Booking storage.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts a booking. Fails with a unique violation of
    /// [`CONFIRMATION_CODE_CONSTRAINT`] if the code is taken.
    async fn insert(&self, booking: NewBooking) -> Result<Booking, StoreError>;

    /// Looks up a booking by id.
    async fn find(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    /// Looks up a booking by confirmation code.
    async fn find_by_code(&self, code: &ConfirmationCode) -> Result<Option<Booking>, StoreError>;

    /// Persists status, admin notes and `updated_at` if the stored row is still at
    /// `booking.version`, then bumps the version.
    ///
    /// Fails with [`StoreError::ConcurrencyConflict`] if the row changed in between.
    async fn update(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Newest bookings first, optionally filtered by status.
    async fn recent(
        &self,
        status: Option<BookingStatus>,
        limit: u32,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Dashboard counts.
    async fn stats(&self, window: StatsWindow) -> Result<BookingStats, StoreError>;
}

/// Marker of a webhook event that has been applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedEvent {
    /// Provider event id
    pub event_id: String,
    /// Provider event type
    pub event_type: String,
    /// When it was applied
    pub processed_at: DateTime<Utc>,
}

/// Payment storage, including the webhook deduplication log.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Whether the event id has already been applied.
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError>;

    /// The payment for a provider intent, with its booking.
    async fn find_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<(Payment, Booking)>, StoreError>;

    /// The payment holding a provider charge, with its booking.
    async fn find_by_charge(&self, charge_id: &str)
    -> Result<Option<(Payment, Booking)>, StoreError>;

    /// Inserts a booking, its payment and the event marker in one transaction.
    async fn create_with_payment(
        &self,
        booking: NewBooking,
        payment: NewPayment,
        event: ProcessedEvent,
    ) -> Result<(Booking, Payment), StoreError>;

    /// Persists an updated payment, optionally its booking, and the event marker in one
    /// transaction. Both rows are version-checked like [`BookingRepository::update`];
    /// on a conflict nothing is written.
    async fn save_reconciliation(
        &self,
        payment: &Payment,
        booking: Option<&Booking>,
        event: ProcessedEvent,
    ) -> Result<(), StoreError>;

    /// Records an event that changed nothing.
    async fn mark_event_processed(&self, event: ProcessedEvent) -> Result<(), StoreError>;
}

/// Review counts for the staff dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReviewStats {
    /// All reviews
    pub total: u64,
    /// Awaiting moderation
    pub pending: u64,
    /// Approved
    pub approved: u64,
    /// Submitted since local midnight
    pub today: u64,
    /// Submitted in the last 7 days
    pub last_7_days: u64,
}

/// Review storage.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Stores an unapproved review.
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError>;

    /// Newest visible reviews of one item.
    async fn visible_for(&self, target: CatalogRef, limit: u32) -> Result<Vec<Review>, StoreError>;

    /// Count and average over the visible reviews of one item.
    async fn rating_summary(&self, target: CatalogRef) -> Result<RatingSummary, StoreError>;

    /// Oldest unapproved reviews first.
    async fn pending(&self, limit: u32) -> Result<Vec<Review>, StoreError>;

    /// Sets the approval flag; `None` if the review does not exist.
    async fn approve(&self, id: ReviewId) -> Result<Option<Review>, StoreError>;

    /// Deletes a review; `false` if it did not exist.
    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError>;

    /// Dashboard counts.
    async fn stats(&self, window: StatsWindow) -> Result<ReviewStats, StoreError>;
}

/// Backend health check used by the readiness endpoint.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Succeeds when the backend answers.
    async fn ping(&self) -> Result<(), StoreError>;
}
