//! Checkout session creation with the recording provider.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use ausflug_core::catalog::{CatalogItem, CatalogRef};
use ausflug_core::error::BookingError;
use ausflug_core::money::Money;
use ausflug_core::validation::CheckoutForm;
use ausflug_testing::{TestContext, fixtures};

const ORIGIN: &str = "https://ausflugagypten.test";

#[tokio::test]
async fn creates_session_with_metadata_and_redirects() {
    let ctx = TestContext::new();
    let tour = ctx.store.seed_item(fixtures::tour());

    let session = ctx
        .checkout
        .create_session(&fixtures::checkout_form(tour.reference(), 2), ORIGIN)
        .await
        .unwrap();

    assert_eq!(session.id, "cs_test_1");
    assert!(session.url.is_some());
    let requests = ctx.provider.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.line_items.len(), 1);
    assert_eq!(request.line_items[0].name, "Tal der Könige");
    assert_eq!(request.line_items[0].unit_amount, Money::from_cents(10_000));
    assert_eq!(request.line_items[0].quantity, 2);
    assert_eq!(
        request.success_url,
        format!("{ORIGIN}/bookings/success/?session_id={{CHECKOUT_SESSION_ID}}")
    );
    assert_eq!(request.cancel_url, format!("{ORIGIN}/bookings/cancel/"));
    assert_eq!(request.customer_email, "sara@example.com");
    assert_eq!(request.metadata, fixtures::metadata(tour.reference(), 2));
}

#[tokio::test]
async fn no_booking_is_written_at_checkout() {
    let ctx = TestContext::new();
    let tour = ctx.store.seed_item(fixtures::tour());

    ctx.checkout
        .create_session(&fixtures::checkout_form(tour.reference(), 2), ORIGIN)
        .await
        .unwrap();

    assert!(ctx.store.bookings().is_empty());
    assert!(ctx.store.payments().is_empty());
}

#[tokio::test]
async fn flat_items_bill_one_unit() {
    let ctx = TestContext::new();
    let transfer = ctx.store.seed_item(fixtures::transfer());

    ctx.checkout
        .create_session(&fixtures::checkout_form(transfer.reference(), 6), ORIGIN)
        .await
        .unwrap();

    let request = &ctx.provider.requests()[0];
    assert_eq!(request.line_items[0].quantity, 1);
    assert_eq!(request.metadata.participants, 6);
}

#[tokio::test]
async fn discounted_unit_price_is_billed() {
    let ctx = TestContext::new();
    let activity = ctx.store.seed_item(fixtures::activity());

    ctx.checkout
        .create_session(&fixtures::checkout_form(activity.reference(), 2), ORIGIN)
        .await
        .unwrap();

    assert_eq!(
        ctx.provider.requests()[0].line_items[0].unit_amount,
        Money::from_cents(4_500)
    );
}

#[tokio::test]
async fn legacy_tour_id_is_accepted() {
    let ctx = TestContext::new();
    let tour = ctx.store.seed_item(fixtures::tour());
    let form = CheckoutForm {
        item: None,
        tour_id: Some(tour.id),
        ..fixtures::checkout_form(tour.reference(), 1)
    };

    ctx.checkout.create_session(&form, ORIGIN).await.unwrap();

    assert_eq!(
        ctx.provider.requests()[0].metadata.item,
        CatalogRef::Tour(tour.id)
    );
}

#[tokio::test]
async fn invalid_request_never_reaches_provider() {
    let ctx = TestContext::new();
    let tour = ctx.store.seed_item(fixtures::tour());
    let form = CheckoutForm {
        participants: Some(0),
        date: "2024-12-31".to_string(),
        ..fixtures::checkout_form(tour.reference(), 1)
    };

    let result = ctx.checkout.create_session(&form, ORIGIN).await;

    match result {
        Err(BookingError::Validation(errors)) => {
            assert!(errors.contains("participants"));
            assert!(errors.contains("date"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(ctx.provider.requests().is_empty());
}

#[tokio::test]
async fn free_items_cannot_be_paid_online() {
    let ctx = TestContext::new();
    let free = ctx.store.seed_item(CatalogItem {
        price: Money::ZERO,
        ..fixtures::tour()
    });

    let result = ctx
        .checkout
        .create_session(&fixtures::checkout_form(free.reference(), 1), ORIGIN)
        .await;

    assert!(matches!(result, Err(BookingError::Validation(e)) if e.contains("item")));
}

#[tokio::test]
async fn inactive_item_is_not_found() {
    let ctx = TestContext::new();
    let hidden = ctx.store.seed_item(CatalogItem {
        is_active: false,
        ..fixtures::tour()
    });

    let result = ctx
        .checkout
        .create_session(&fixtures::checkout_form(hidden.reference(), 1), ORIGIN)
        .await;

    assert!(matches!(result, Err(BookingError::NotFound(_))));
}

#[tokio::test]
async fn provider_failure_is_external_error() {
    let ctx = TestContext::new();
    let tour = ctx.store.seed_item(fixtures::tour());
    ctx.provider.set_failing(true);

    let result = ctx
        .checkout
        .create_session(&fixtures::checkout_form(tour.reference(), 1), ORIGIN)
        .await;

    assert!(matches!(result, Err(BookingError::ExternalProvider(_))));
    assert!(ctx.store.bookings().is_empty());
}
