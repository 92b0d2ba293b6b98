//! Reducer tests for the booking and payment aggregates.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use ausflug_core::aggregates::{
    BookingAction, BookingEnvironment, BookingReducer, BookingState, PaymentAction,
    PaymentEnvironment, PaymentReducer, PaymentState,
};
use ausflug_core::booking::{Booking, BookingId, BookingStatus};
use ausflug_core::catalog::CatalogRef;
use ausflug_core::environment::Clock;
use ausflug_core::error::TransitionError;
use ausflug_core::money::Money;
use ausflug_core::notify::Recipient;
use ausflug_core::payment::{NewPayment, Payment, PaymentId, PaymentStatus};
use ausflug_testing::{ReducerTest, assertions, fixtures, test_clock};
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

fn booking(status: BookingStatus) -> Booking {
    fixtures::new_booking(CatalogRef::Tour(1), status, test_clock().now())
        .into_booking(BookingId::new(7))
}

fn booking_env() -> BookingEnvironment {
    BookingEnvironment::new(Arc::new(test_clock()))
}

fn payment(status: PaymentStatus) -> Payment {
    NewPayment {
        payment_intent_id: "pi_1".to_string(),
        charge_id: None,
        amount: Money::from_cents(20_000),
        currency: "eur".to_string(),
        status,
        failure_reason: None,
        paid_at: None,
        created_at: test_clock().now(),
    }
    .into_payment(PaymentId::new(3), BookingId::new(7))
}

fn payment_env() -> PaymentEnvironment {
    PaymentEnvironment::new(Arc::new(test_clock()))
}

fn customer() -> Recipient {
    Recipient::Customer("sara@example.com".to_string())
}

// ============================================================================
// Booking
// ============================================================================

#[test]
fn confirm_pending_booking_notifies_customer() {
    ReducerTest::new(BookingReducer, booking_env())
        .given(BookingState::new(booking(BookingStatus::Pending)))
        .when(BookingAction::Confirm)
        .then_state(|state| {
            assert_eq!(state.booking.status, BookingStatus::Confirmed);
            assert!(state.last_error.is_none());
        })
        .then_effects(|effects| assertions::assert_notifies(effects, &[customer()]))
        .run();
}

#[test]
fn payment_received_notifies_customer_and_staff() {
    ReducerTest::new(BookingReducer, booking_env())
        .given(BookingState::new(booking(BookingStatus::Pending)))
        .when(BookingAction::PaymentReceived {
            item_title: "Valley of the Kings".to_string(),
        })
        .then_state(|state| assert_eq!(state.booking.status, BookingStatus::Confirmed))
        .then_effects(|effects| {
            assertions::assert_notifies(effects, &[customer(), Recipient::Staff]);
            let emails = assertions::emails(effects);
            assert!(emails[0].body.contains("Valley of the Kings"));
        })
        .run();
}

#[test]
fn cancel_appends_reason_to_admin_notes() {
    let mut initial = booking(BookingStatus::Confirmed);
    initial.admin_notes = "Called customer".to_string();

    ReducerTest::new(BookingReducer, booking_env())
        .given(BookingState::new(initial))
        .when(BookingAction::Cancel {
            reason: Some("weather".to_string()),
        })
        .then_state(|state| {
            assert_eq!(state.booking.status, BookingStatus::Cancelled);
            assert_eq!(state.booking.admin_notes, "Called customer\nCancelled: weather");
        })
        .run();
}

#[test]
fn completed_booking_cannot_be_confirmed_again() {
    ReducerTest::new(BookingReducer, booking_env())
        .given(BookingState::new(booking(BookingStatus::Completed)))
        .when(BookingAction::Confirm)
        .then_state(|state| {
            assert_eq!(state.booking.status, BookingStatus::Completed);
            assert_eq!(
                state.last_error,
                Some(TransitionError::Booking {
                    from: BookingStatus::Completed,
                    to: BookingStatus::Confirmed,
                })
            );
        })
        .then_effects(assertions::assert_silent)
        .run();
}

#[test]
fn pending_booking_cannot_complete() {
    ReducerTest::new(BookingReducer, booking_env())
        .given(BookingState::new(booking(BookingStatus::Pending)))
        .when(BookingAction::Complete)
        .then_state(|state| {
            assert_eq!(state.booking.status, BookingStatus::Pending);
            assert!(state.last_error.is_some());
        })
        .run();
}

#[test]
fn cancelled_is_terminal() {
    for action in [
        BookingAction::Confirm,
        BookingAction::Complete,
        BookingAction::Cancel { reason: None },
    ] {
        ReducerTest::new(BookingReducer, booking_env())
            .given(BookingState::new(booking(BookingStatus::Cancelled)))
            .when(action)
            .then_state(|state| {
                assert_eq!(state.booking.status, BookingStatus::Cancelled);
                assert!(state.last_error.is_some());
            })
            .then_effects(assertions::assert_silent)
            .run();
    }
}

#[test]
fn full_lifecycle_through_completion() {
    ReducerTest::new(BookingReducer, booking_env())
        .given(BookingState::new(booking(BookingStatus::Pending)))
        .when(BookingAction::Confirm)
        .when(BookingAction::AnnotateAdmin {
            note: "Pickup 7:00 at hotel".to_string(),
        })
        .when(BookingAction::Complete)
        .then_state(|state| {
            assert_eq!(state.booking.status, BookingStatus::Completed);
            assert_eq!(state.booking.admin_notes, "Pickup 7:00 at hotel");
        })
        .then_effects(|effects| assertions::assert_notifies(effects, &[customer(), customer()]))
        .run();
}

#[test]
fn annotation_does_not_change_status_or_notify() {
    ReducerTest::new(BookingReducer, booking_env())
        .given(BookingState::new(booking(BookingStatus::Pending)))
        .when(BookingAction::AnnotateAdmin {
            note: "  ".to_string(),
        })
        .then_state(|state| {
            assert_eq!(state.booking.status, BookingStatus::Pending);
            assert!(state.booking.admin_notes.is_empty());
        })
        .then_effects(assertions::assert_silent)
        .run();
}

// ============================================================================
// Payment
// ============================================================================

#[test]
fn succeed_records_charge_and_paid_at() {
    let mut initial = payment(PaymentStatus::Failed);
    initial.failure_reason = Some("card_declined".to_string());

    ReducerTest::new(PaymentReducer, payment_env())
        .given(PaymentState::new(initial))
        .when(PaymentAction::Succeed {
            charge_id: Some("ch_1".to_string()),
        })
        .then_state(|state| {
            assert_eq!(state.payment.status, PaymentStatus::Succeeded);
            assert_eq!(state.payment.charge_id.as_deref(), Some("ch_1"));
            assert_eq!(state.payment.paid_at, Some(test_clock().now()));
            assert!(state.payment.failure_reason.is_none());
        })
        .then_effects(assertions::assert_silent)
        .run();
}

#[test]
fn succeeded_payment_never_regresses_to_failed() {
    ReducerTest::new(PaymentReducer, payment_env())
        .given(PaymentState::new(payment(PaymentStatus::Succeeded)))
        .when(PaymentAction::Fail {
            reason: "late failure".to_string(),
        })
        .then_state(|state| {
            assert_eq!(state.payment.status, PaymentStatus::Succeeded);
            assert!(state.payment.failure_reason.is_none());
            assert_eq!(
                state.last_error,
                Some(TransitionError::Payment {
                    from: PaymentStatus::Succeeded,
                    to: PaymentStatus::Failed,
                })
            );
        })
        .run();
}

#[test]
fn only_succeeded_payments_can_be_refunded() {
    ReducerTest::new(PaymentReducer, payment_env())
        .given(PaymentState::new(payment(PaymentStatus::Pending)))
        .when(PaymentAction::Refund)
        .then_state(|state| {
            assert_eq!(state.payment.status, PaymentStatus::Pending);
            assert!(state.last_error.is_some());
        })
        .run();

    ReducerTest::new(PaymentReducer, payment_env())
        .given(PaymentState::new(payment(PaymentStatus::Pending)))
        .when(PaymentAction::StartProcessing)
        .when(PaymentAction::Succeed { charge_id: None })
        .when(PaymentAction::Refund)
        .then_state(|state| assert_eq!(state.payment.status, PaymentStatus::Refunded))
        .run();
}
