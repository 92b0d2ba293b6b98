//! Metric names and descriptions.

use metrics::describe_counter;

/// Accepted inquiries, labelled by catalog `kind`.
pub const INQUIRIES_TOTAL: &str = "ausflug_inquiries_total";
/// Inquiries rejected by validation or item lookup.
pub const INQUIRIES_REJECTED_TOTAL: &str = "ausflug_inquiries_rejected_total";
/// Checkout session attempts, labelled by `outcome`.
pub const CHECKOUT_SESSIONS_TOTAL: &str = "ausflug_checkout_sessions_total";
/// Webhook deliveries, labelled by `outcome`.
pub const WEBHOOK_EVENTS_TOTAL: &str = "ausflug_webhook_events_total";
/// Stored reviews.
pub const REVIEWS_SUBMITTED_TOTAL: &str = "ausflug_reviews_submitted_total";
/// Booking status changes, labelled by target status `to`.
pub const BOOKING_TRANSITIONS_TOTAL: &str = "ausflug_booking_transitions_total";
/// E-mails that could not be delivered.
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "ausflug_notifications_failed_total";

/// Registers descriptions for every counter with the installed recorder.
pub fn describe() {
    describe_counter!(INQUIRIES_TOTAL, "Booking inquiries accepted");
    describe_counter!(
        INQUIRIES_REJECTED_TOTAL,
        "Booking inquiries rejected by validation or lookup"
    );
    describe_counter!(CHECKOUT_SESSIONS_TOTAL, "Checkout session attempts");
    describe_counter!(WEBHOOK_EVENTS_TOTAL, "Payment webhook deliveries");
    describe_counter!(REVIEWS_SUBMITTED_TOTAL, "Reviews stored for moderation");
    describe_counter!(BOOKING_TRANSITIONS_TOTAL, "Booking status changes");
    describe_counter!(
        NOTIFICATIONS_FAILED_TOTAL,
        "Notification e-mails that could not be delivered"
    );
}
