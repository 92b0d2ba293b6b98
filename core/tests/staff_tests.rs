//! Staff dashboard counts and booking transitions.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use ausflug_core::booking::{BookingId, BookingStatus};
use ausflug_core::catalog::{CatalogItem, CatalogKind, CatalogRef};
use ausflug_core::error::BookingError;
use ausflug_core::money::Money;
use ausflug_core::notify::Recipient;
use ausflug_core::repository::BookingRepository;
use ausflug_testing::{TestContext, fixtures};
use chrono::{DateTime, Utc};

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn dashboard_counts_windows_revenue_and_content() {
    let ctx = TestContext::new();
    ctx.clock.set(at("2025-02-01T10:00:00Z"));
    let tour = ctx.store.seed_item(fixtures::tour());
    ctx.store.seed_item(fixtures::activity());
    ctx.store.seed_item(CatalogItem {
        is_active: false,
        ..fixtures::item(CatalogKind::Tour, "retired", Money::from_cents(100))
    });
    let item = tour.reference();
    for (status, created) in [
        (BookingStatus::Pending, "2025-02-01T08:00:00Z"),
        (BookingStatus::Confirmed, "2025-01-29T12:00:00Z"),
        (BookingStatus::Completed, "2025-01-10T12:00:00Z"),
        (BookingStatus::Cancelled, "2024-12-01T12:00:00Z"),
        (BookingStatus::Pending, "2025-01-20T12:00:00Z"),
    ] {
        ctx.store
            .seed_booking(fixtures::new_booking(item, status, at(created)));
    }
    ctx.store.seed_review(fixtures::review(item, 5, true));
    ctx.store.seed_review(fixtures::review(item, 2, false));

    let dashboard = ctx.dashboard.snapshot().await.unwrap();

    let bookings = dashboard.bookings;
    assert_eq!(bookings.total, 5);
    assert_eq!(bookings.pending, 2);
    assert_eq!(bookings.confirmed, 1);
    assert_eq!(bookings.today, 1);
    assert_eq!(bookings.last_7_days, 2);
    assert_eq!(bookings.last_30_days, 4);
    assert_eq!(bookings.new_pending, 1);
    assert_eq!(bookings.revenue.to_string(), "400.00");

    assert_eq!(dashboard.reviews.total, 2);
    assert_eq!(dashboard.reviews.pending, 1);
    assert_eq!(dashboard.reviews.approved, 1);

    assert_eq!(dashboard.content[&CatalogKind::Tour], 1);
    assert_eq!(dashboard.content[&CatalogKind::Activity], 1);
    assert_eq!(dashboard.content[&CatalogKind::Excursion], 0);
    assert_eq!(dashboard.content[&CatalogKind::Transfer], 0);

    assert_eq!(dashboard.notifications.new_bookings, 1);
    assert_eq!(dashboard.notifications.pending_reviews, 1);
    assert_eq!(dashboard.notifications.total, 2);
}

#[tokio::test]
async fn dashboard_fails_when_store_is_down() {
    let ctx = TestContext::new();
    ctx.store.set_unavailable(true);

    assert!(matches!(
        ctx.dashboard.snapshot().await,
        Err(BookingError::Store(_))
    ));
}

#[tokio::test]
async fn confirm_records_note_and_notifies_customer() {
    let ctx = TestContext::new();
    let booking = ctx.store.seed_booking(fixtures::new_booking(
        CatalogRef::Tour(1),
        BookingStatus::Pending,
        at("2024-12-30T09:00:00Z"),
    ));

    let updated = ctx
        .staff
        .transition(
            booking.id,
            BookingStatus::Confirmed,
            Some("Guide: Ahmed".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(updated.status, BookingStatus::Confirmed);
    assert_eq!(updated.admin_notes, "Guide: Ahmed");
    assert_eq!(updated.updated_at, at("2025-01-01T00:00:00Z"));
    assert_eq!(ctx.store.bookings()[0], updated);
    assert_eq!(
        ctx.notifier.recipients(),
        vec![Recipient::Customer("sara@example.com".to_string())]
    );
}

#[tokio::test]
async fn cancel_records_reason() {
    let ctx = TestContext::new();
    let booking = ctx.store.seed_booking(fixtures::new_booking(
        CatalogRef::Tour(1),
        BookingStatus::Confirmed,
        at("2024-12-30T09:00:00Z"),
    ));

    let updated = ctx
        .staff
        .transition(
            booking.id,
            BookingStatus::Cancelled,
            Some("customer request".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(updated.status, BookingStatus::Cancelled);
    assert_eq!(updated.admin_notes, "Cancelled: customer request");
}

#[tokio::test]
async fn forbidden_transition_changes_nothing() {
    let ctx = TestContext::new();
    let booking = ctx.store.seed_booking(fixtures::new_booking(
        CatalogRef::Tour(1),
        BookingStatus::Pending,
        at("2024-12-30T09:00:00Z"),
    ));

    let complete = ctx
        .staff
        .transition(booking.id, BookingStatus::Completed, Some("done".to_string()))
        .await;
    let reopen = ctx
        .staff
        .transition(booking.id, BookingStatus::Pending, None)
        .await;

    assert!(matches!(complete, Err(BookingError::InvalidTransition(_))));
    assert!(matches!(reopen, Err(BookingError::InvalidTransition(_))));
    assert_eq!(ctx.store.bookings(), vec![booking]);
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test]
async fn stale_copy_cannot_overwrite_a_transition() {
    let ctx = TestContext::new();
    let stale = ctx.store.seed_booking(fixtures::new_booking(
        CatalogRef::Tour(1),
        BookingStatus::Pending,
        at("2024-12-30T09:00:00Z"),
    ));
    let cancelled = ctx
        .staff
        .transition(stale.id, BookingStatus::Cancelled, Some("no show".to_string()))
        .await
        .unwrap();

    let mut overwrite = stale.clone();
    overwrite.status = BookingStatus::Confirmed;
    let err = ctx.store.update(&overwrite).await.unwrap_err();

    assert!(err.is_conflict(), "{err:?}");
    assert_eq!(cancelled.version, stale.version + 1);
    assert_eq!(ctx.store.bookings(), vec![cancelled]);
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let ctx = TestContext::new();

    let result = ctx
        .staff
        .transition(BookingId::new(404), BookingStatus::Confirmed, None)
        .await;

    assert!(matches!(result, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn recent_filters_by_status_newest_first() {
    let ctx = TestContext::new();
    for (status, created) in [
        (BookingStatus::Pending, "2024-12-01T09:00:00Z"),
        (BookingStatus::Confirmed, "2024-12-02T09:00:00Z"),
        (BookingStatus::Pending, "2024-12-03T09:00:00Z"),
    ] {
        ctx.store.seed_booking(fixtures::new_booking(
            CatalogRef::Tour(1),
            status,
            at(created),
        ));
    }

    let pending = ctx
        .staff
        .recent(Some(BookingStatus::Pending), 10)
        .await
        .unwrap();
    let latest = ctx.staff.recent(None, 1).await.unwrap();

    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].created_at, at("2024-12-03T09:00:00Z"));
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].created_at, at("2024-12-03T09:00:00Z"));
}
