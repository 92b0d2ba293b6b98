//! In-memory repositories
//!
//! [`InMemoryStore`] implements every storage port of `ausflug-core` over plain vectors
//! behind one lock. Unique constraints are emulated with the same constraint names the
//! Postgres schema uses, and multi-row writes check every constraint before touching
//! anything, so tests observe the same all-or-nothing behaviour as a transaction.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use async_trait::async_trait;
use ausflug_core::booking::{Booking, BookingId, BookingStatus, NewBooking};
use ausflug_core::catalog::{CatalogItem, CatalogKind, CatalogRef};
use ausflug_core::confirmation::ConfirmationCode;
use ausflug_core::environment::StatsWindow;
use ausflug_core::error::StoreError;
use ausflug_core::listing::{ListingQuery, Page};
use ausflug_core::money::Money;
use ausflug_core::payment::{NewPayment, Payment, PaymentId};
use ausflug_core::repository::{
    BookingRepository, BookingStats, CONFIRMATION_CODE_CONSTRAINT, CatalogRepository,
    PAYMENT_INTENT_CONSTRAINT, PROCESSED_EVENT_CONSTRAINT, PaymentRepository, ProcessedEvent,
    ReadinessProbe, ReviewRepository, ReviewStats,
};
use ausflug_core::review::{NewReview, RatingSummary, Review, ReviewId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Unique constraint on catalog slugs.
pub const CATALOG_SLUG_CONSTRAINT: &str = "catalog_items_kind_slug_key";

#[derive(Default)]
struct Tables {
    items: Vec<CatalogItem>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
    reviews: Vec<Review>,
    processed: HashMap<String, ProcessedEvent>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_code(&self, code: &ConfirmationCode) -> Result<(), StoreError> {
        if self.bookings.iter().any(|b| &b.confirmation_code == code) {
            return Err(violation(CONFIRMATION_CODE_CONSTRAINT));
        }
        Ok(())
    }

    fn check_event(&self, event: &ProcessedEvent) -> Result<(), StoreError> {
        if self.processed.contains_key(&event.event_id) {
            return Err(violation(PROCESSED_EVENT_CONSTRAINT));
        }
        Ok(())
    }

    fn booking_of(&self, payment: &Payment) -> Result<Booking, StoreError> {
        self.bookings
            .iter()
            .find(|b| b.id == payment.booking_id)
            .cloned()
            .ok_or_else(|| StoreError::Corrupt(format!("payment {} has no booking", payment.id)))
    }

    fn booking_slot(&mut self, booking: &Booking) -> Result<&mut Booking, StoreError> {
        let slot = self
            .bookings
            .iter_mut()
            .find(|b| b.id == booking.id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking.id)))?;
        if slot.version != booking.version {
            return Err(StoreError::conflict(format!("booking {}", booking.id), booking.version));
        }
        Ok(slot)
    }

    fn payment_index(&self, payment: &Payment) -> Result<usize, StoreError> {
        let index = self
            .payments
            .iter()
            .position(|p| p.id == payment.id)
            .ok_or_else(|| StoreError::NotFound(format!("payment {}", payment.id)))?;
        if self.payments[index].version != payment.version {
            return Err(StoreError::conflict(format!("payment {}", payment.id), payment.version));
        }
        Ok(index)
    }

    fn replace_booking(&mut self, booking: &Booking) -> Result<(), StoreError> {
        let slot = self.booking_slot(booking)?;
        slot.status = booking.status;
        slot.admin_notes.clone_from(&booking.admin_notes);
        slot.updated_at = booking.updated_at;
        slot.version += 1;
        Ok(())
    }
}

fn violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

/// In-memory implementation of all repositories.
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with a backend error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Backend("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    /// Seeds an item synchronously, keeping its id if non-zero.
    pub fn seed_item(&self, mut item: CatalogItem) -> CatalogItem {
        let mut tables = self.tables.write().unwrap();
        if item.id == 0 {
            item.id = tables.next_id();
        } else {
            tables.next_id = tables.next_id.max(item.id);
        }
        tables.items.push(item.clone());
        item
    }

    /// Seeds a review synchronously, e.g. an already approved one.
    pub fn seed_review(&self, mut review: Review) -> Review {
        let mut tables = self.tables.write().unwrap();
        review.id = ReviewId::new(tables.next_id());
        tables.reviews.push(review.clone());
        review
    }

    /// Seeds a booking synchronously, bypassing constraints.
    pub fn seed_booking(&self, booking: NewBooking) -> Booking {
        let mut tables = self.tables.write().unwrap();
        let booking = booking.into_booking(BookingId::new(tables.next_id()));
        tables.bookings.push(booking.clone());
        booking
    }

    /// Snapshot of all bookings, in insertion order.
    #[must_use]
    pub fn bookings(&self) -> Vec<Booking> {
        self.tables.read().unwrap().bookings.clone()
    }

    /// Snapshot of all payments, in insertion order.
    #[must_use]
    pub fn payments(&self) -> Vec<Payment> {
        self.tables.read().unwrap().payments.clone()
    }

    /// Snapshot of all reviews, in insertion order.
    #[must_use]
    pub fn reviews(&self) -> Vec<Review> {
        self.tables.read().unwrap().reviews.clone()
    }

    /// Number of recorded webhook events.
    #[must_use]
    pub fn processed_event_count(&self) -> usize {
        self.tables.read().unwrap().processed.len()
    }

    /// Whether an event id has been recorded.
    #[must_use]
    pub fn is_processed(&self, event_id: &str) -> bool {
        self.tables.read().unwrap().processed.contains_key(event_id)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn find(&self, item: CatalogRef) -> Result<Option<CatalogItem>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        Ok(tables
            .items
            .iter()
            .find(|i| i.reference() == item)
            .cloned())
    }

    async fn find_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItem>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        Ok(tables
            .items
            .iter()
            .find(|i| i.kind == kind && i.slug == slug && i.is_active)
            .cloned())
    }

    async fn list(&self, query: &ListingQuery) -> Result<Page<CatalogItem>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        let mut matching: Vec<&CatalogItem> =
            tables.items.iter().filter(|i| query.matches(i)).collect();
        matching.sort_by(|a, b| query.compare(a, b));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.page_size() as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, query.page, query.page_size(), total))
    }

    async fn count_active(&self) -> Result<BTreeMap<CatalogKind, u64>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        let mut counts: BTreeMap<CatalogKind, u64> =
            CatalogKind::ALL.into_iter().map(|k| (k, 0)).collect();
        for item in tables.items.iter().filter(|i| i.is_active) {
            *counts.entry(item.kind).or_default() += 1;
        }
        Ok(counts)
    }

    async fn insert(&self, mut item: CatalogItem) -> Result<CatalogItem, StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        if tables
            .items
            .iter()
            .any(|i| i.kind == item.kind && i.slug == item.slug)
        {
            return Err(violation(CATALOG_SLUG_CONSTRAINT));
        }
        item.id = tables.next_id();
        tables.items.push(item.clone());
        Ok(item)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        tables.check_code(&booking.confirmation_code)?;
        let booking = booking.into_booking(BookingId::new(tables.next_id()));
        tables.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn find(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        Ok(tables.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_code(&self, code: &ConfirmationCode) -> Result<Option<Booking>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        Ok(tables
            .bookings
            .iter()
            .find(|b| &b.confirmation_code == code)
            .cloned())
    }

    async fn update(&self, booking: &Booking) -> Result<(), StoreError> {
        self.guard()?;
        self.tables.write().unwrap().replace_booking(booking)
    }

    async fn recent(
        &self,
        status: Option<BookingStatus>,
        limit: u32,
    ) -> Result<Vec<Booking>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        let mut bookings: Vec<Booking> = tables
            .bookings
            .iter()
            .filter(|b| status.is_none_or(|s| b.status == s))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        bookings.truncate(limit as usize);
        Ok(bookings)
    }

    async fn stats(&self, window: StatsWindow) -> Result<BookingStats, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        let count = |pred: &dyn Fn(&Booking) -> bool| {
            tables.bookings.iter().filter(|b| pred(b)).count() as u64
        };
        let revenue = tables
            .bookings
            .iter()
            .filter(|b| matches!(b.status, BookingStatus::Confirmed | BookingStatus::Completed))
            .fold(Money::ZERO, |sum, b| {
                sum.checked_add(b.total_price).unwrap_or(sum)
            });
        Ok(BookingStats {
            total: count(&|_| true),
            pending: count(&|b| b.status == BookingStatus::Pending),
            confirmed: count(&|b| b.status == BookingStatus::Confirmed),
            today: count(&|b| b.created_at >= window.today_start),
            last_7_days: count(&|b| b.created_at >= window.week_start),
            last_30_days: count(&|b| b.created_at >= window.month_start),
            new_pending: count(&|b| {
                b.status == BookingStatus::Pending && b.created_at >= window.week_start
            }),
            revenue,
        })
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        self.guard()?;
        Ok(self.tables.read().unwrap().processed.contains_key(event_id))
    }

    async fn find_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<(Payment, Booking)>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        match tables
            .payments
            .iter()
            .find(|p| p.payment_intent_id == payment_intent_id)
        {
            Some(payment) => Ok(Some((payment.clone(), tables.booking_of(payment)?))),
            None => Ok(None),
        }
    }

    async fn find_by_charge(
        &self,
        charge_id: &str,
    ) -> Result<Option<(Payment, Booking)>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        match tables
            .payments
            .iter()
            .find(|p| p.charge_id.as_deref() == Some(charge_id))
        {
            Some(payment) => Ok(Some((payment.clone(), tables.booking_of(payment)?))),
            None => Ok(None),
        }
    }

    async fn create_with_payment(
        &self,
        booking: NewBooking,
        payment: NewPayment,
        event: ProcessedEvent,
    ) -> Result<(Booking, Payment), StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        tables.check_code(&booking.confirmation_code)?;
        if tables
            .payments
            .iter()
            .any(|p| p.payment_intent_id == payment.payment_intent_id)
        {
            return Err(violation(PAYMENT_INTENT_CONSTRAINT));
        }
        tables.check_event(&event)?;

        let booking = booking.into_booking(BookingId::new(tables.next_id()));
        let payment = payment.into_payment(PaymentId::new(tables.next_id()), booking.id);
        tables.bookings.push(booking.clone());
        tables.payments.push(payment.clone());
        tables.processed.insert(event.event_id.clone(), event);
        Ok((booking, payment))
    }

    async fn save_reconciliation(
        &self,
        payment: &Payment,
        booking: Option<&Booking>,
        event: ProcessedEvent,
    ) -> Result<(), StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        tables.check_event(&event)?;
        let index = tables.payment_index(payment)?;
        if let Some(booking) = booking {
            tables.replace_booking(booking)?;
        }
        tables.payments[index] = Payment {
            version: payment.version + 1,
            ..payment.clone()
        };
        tables.processed.insert(event.event_id.clone(), event);
        Ok(())
    }

    async fn mark_event_processed(&self, event: ProcessedEvent) -> Result<(), StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        tables.check_event(&event)?;
        tables.processed.insert(event.event_id.clone(), event);
        Ok(())
    }
}

#[async_trait]
impl ReviewRepository for InMemoryStore {
    async fn insert(&self, review: NewReview) -> Result<Review, StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        let review = Review {
            id: ReviewId::new(tables.next_id()),
            target: review.target,
            name: review.name,
            email: review.email,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            is_approved: false,
            created_at: chrono::Utc::now(),
        };
        tables.reviews.push(review.clone());
        Ok(review)
    }

    async fn visible_for(&self, target: CatalogRef, limit: u32) -> Result<Vec<Review>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        let mut visible: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.target == target && r.is_visible())
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        visible.truncate(limit as usize);
        Ok(visible)
    }

    async fn rating_summary(&self, target: CatalogRef) -> Result<RatingSummary, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        Ok(RatingSummary::from_ratings(
            tables
                .reviews
                .iter()
                .filter(|r| r.target == target && r.is_visible())
                .map(|r| r.rating),
        ))
    }

    async fn pending(&self, limit: u32) -> Result<Vec<Review>, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        let mut pending: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| !r.is_approved)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn approve(&self, id: ReviewId) -> Result<Option<Review>, StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        Ok(tables.reviews.iter_mut().find(|r| r.id == id).map(|r| {
            r.is_approved = true;
            r.clone()
        }))
    }

    async fn delete(&self, id: ReviewId) -> Result<bool, StoreError> {
        self.guard()?;
        let mut tables = self.tables.write().unwrap();
        let before = tables.reviews.len();
        tables.reviews.retain(|r| r.id != id);
        Ok(tables.reviews.len() != before)
    }

    async fn stats(&self, window: StatsWindow) -> Result<ReviewStats, StoreError> {
        self.guard()?;
        let tables = self.tables.read().unwrap();
        let count = |pred: &dyn Fn(&Review) -> bool| {
            tables.reviews.iter().filter(|r| pred(r)).count() as u64
        };
        Ok(ReviewStats {
            total: count(&|_| true),
            pending: count(&|r| !r.is_approved),
            approved: count(&|r| r.is_approved),
            today: count(&|r| r.created_at >= window.today_start),
            last_7_days: count(&|r| r.created_at >= window.week_start),
        })
    }
}

#[async_trait]
impl ReadinessProbe for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.guard()
    }
}
