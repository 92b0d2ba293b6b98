//! Property-based testing utilities using proptest.

use ausflug_core::booking::{BookingStatus, Participants};
use ausflug_core::catalog::{CatalogKind, CatalogRef};
use ausflug_core::confirmation::ConfirmationCode;
use ausflug_core::money::Money;
use ausflug_core::payment::PaymentStatus;
use ausflug_core::validation::{MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use proptest::prelude::*;

/// Prices up to 10 000.00 EUR.
pub fn money() -> impl Strategy<Value = Money> {
    (0u64..=1_000_000).prop_map(Money::from_cents)
}

/// Any catalog kind.
pub fn catalog_kind() -> impl Strategy<Value = CatalogKind> {
    prop::sample::select(CatalogKind::ALL.to_vec())
}

/// References with positive ids.
pub fn catalog_ref() -> impl Strategy<Value = CatalogRef> {
    (catalog_kind(), 1i64..100_000).prop_map(|(kind, id)| CatalogRef::new(kind, id))
}

/// Breakdowns whose total lies in the accepted range.
pub fn participants() -> impl Strategy<Value = Participants> {
    (MIN_PARTICIPANTS..=MAX_PARTICIPANTS)
        .prop_flat_map(|total| (Just(total), 0..=total))
        .prop_flat_map(|(total, adults)| (Just(total), Just(adults), 0..=total - adults))
        .prop_map(|(total, adults, children)| Participants {
            adults,
            children,
            babies: total - adults - children,
        })
}

/// Well-formed confirmation codes.
pub fn confirmation_code() -> impl Strategy<Value = ConfirmationCode> {
    "[0-9A-F]{8}".prop_filter_map("valid code", |hex| {
        ConfirmationCode::parse(&format!("AE-{hex}")).ok()
    })
}

/// Any booking status.
pub fn booking_status() -> impl Strategy<Value = BookingStatus> {
    prop_oneof![
        Just(BookingStatus::Pending),
        Just(BookingStatus::Confirmed),
        Just(BookingStatus::Completed),
        Just(BookingStatus::Cancelled),
    ]
}

/// Any payment status.
pub fn payment_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Processing),
        Just(PaymentStatus::Succeeded),
        Just(PaymentStatus::Failed),
        Just(PaymentStatus::Refunded),
    ]
}
