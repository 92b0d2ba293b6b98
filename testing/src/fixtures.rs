//! Test fixtures and a fully wired service context.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use crate::memory::InMemoryStore;
use crate::mocks::{FixedClock, SequenceCodeGenerator, test_clock};
use crate::notifier::RecordingNotifier;
use crate::provider::MockPaymentProvider;
use ausflug_core::booking::{BookingStatus, Contact, NewBooking, Participants};
use ausflug_core::catalog::{Capacity, CatalogItem, CatalogKind, CatalogRef, GroupSize, PricingMode};
use ausflug_core::confirmation::ConfirmationCode;
use ausflug_core::environment::{Clock, SiteCalendar};
use ausflug_core::money::Money;
use ausflug_core::provider::CheckoutMetadata;
use ausflug_core::review::{Review, ReviewId};
use ausflug_core::runtime::EffectRunner;
use ausflug_core::services::{
    BookingAdminService, CatalogService, CheckoutService, DashboardService, FailurePolicy,
    InquiryService, ReconciliationService, ReviewService,
};
use ausflug_core::validation::{CheckoutForm, InquiryForm, ReviewForm};
use ausflug_core::webhook::{SIGNATURE_HEADER, WebhookVerifier, sign};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;

/// Endpoint secret used by the signed payload builders.
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// A travel date after the test clock's "today".
#[must_use]
pub fn travel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn epoch() -> DateTime<Utc> {
    test_clock().now()
}

/// Base item; the store assigns the id.
#[must_use]
pub fn item(kind: CatalogKind, slug: &str, price: Money) -> CatalogItem {
    CatalogItem {
        id: 0,
        kind,
        slug: slug.to_string(),
        title: format!("{slug} (de)"),
        title_en: slug.replace('-', " "),
        short_description: String::new(),
        short_description_en: String::new(),
        description: format!("Beschreibung von {slug}"),
        description_en: format!("Description of {slug}"),
        category: None,
        location: None,
        price,
        original_price: None,
        discount_price: None,
        pricing: PricingMode::PerPerson,
        capacity: Capacity::MaxParticipants(20),
        duration: "1 day".to_string(),
        is_active: true,
        is_featured: false,
        is_popular: false,
        is_bestseller: false,
        created_at: epoch(),
    }
}

/// Per-person tour at 100.00 EUR in Luxor.
#[must_use]
pub fn tour() -> CatalogItem {
    CatalogItem {
        title: "Tal der Könige".to_string(),
        title_en: "Valley of the Kings".to_string(),
        category: Some("history".to_string()),
        location: Some("Luxor".to_string()),
        ..item(CatalogKind::Tour, "valley-of-the-kings", Money::from_cents(10_000))
    }
}

/// Discounted activity with a group size class.
#[must_use]
pub fn activity() -> CatalogItem {
    CatalogItem {
        title: "Schnorcheln".to_string(),
        title_en: "Snorkeling".to_string(),
        location: Some("Hurghada".to_string()),
        original_price: Some(Money::from_cents(6_000)),
        discount_price: Some(Money::from_cents(4_500)),
        capacity: Capacity::GroupSize(GroupSize::Small),
        ..item(CatalogKind::Activity, "snorkeling", Money::from_cents(6_000))
    }
}

/// Flat-priced airport transfer.
#[must_use]
pub fn transfer() -> CatalogItem {
    CatalogItem {
        title: "Flughafentransfer".to_string(),
        title_en: "Airport transfer".to_string(),
        location: Some("Hurghada".to_string()),
        pricing: PricingMode::Flat,
        ..item(CatalogKind::Transfer, "airport-transfer", Money::from_cents(3_500))
    }
}

/// Customer contact used throughout the fixtures.
#[must_use]
pub fn contact() -> Contact {
    Contact {
        name: "Sara Klein".to_string(),
        email: "sara@example.com".to_string(),
        phone: "+49 30 1234".to_string(),
    }
}

/// Valid inquiry for a tour, two adults and one child.
#[must_use]
pub fn inquiry_form(tour_id: i64) -> InquiryForm {
    InquiryForm {
        tour_id: Some(tour_id.to_string()),
        date: travel_date().to_string(),
        persons: "3".to_string(),
        adults: Some("2".to_string()),
        children: Some("1".to_string()),
        babies: Some("0".to_string()),
        name: contact().name,
        email: contact().email,
        phone: contact().phone,
        special_requests: "Vegetarian lunch".to_string(),
        ..InquiryForm::default()
    }
}

/// Valid checkout request.
#[must_use]
pub fn checkout_form(item: CatalogRef, participants: u32) -> CheckoutForm {
    CheckoutForm {
        item: Some(item),
        tour_id: None,
        participants: Some(participants),
        date: travel_date().to_string(),
        name: contact().name,
        email: contact().email,
        phone: contact().phone,
        special_requests: String::new(),
    }
}

/// Valid review form.
#[must_use]
pub fn review_form(target: CatalogRef, rating: u8) -> ReviewForm {
    ReviewForm {
        content_type: target.kind().as_str().to_string(),
        object_id: target.id().to_string(),
        rating: rating.to_string(),
        name: "Jonas".to_string(),
        email: "jonas@example.com".to_string(),
        title: "Unforgettable".to_string(),
        comment: "Great guide, great day.".to_string(),
    }
}

/// A stored review; seeding assigns the id.
#[must_use]
pub fn review(target: CatalogRef, rating: u8, approved: bool) -> Review {
    Review {
        id: ReviewId::new(0),
        target,
        name: "Jonas".to_string(),
        email: "jonas@example.com".to_string(),
        rating,
        title: format!("{rating} stars"),
        comment: "Seen it all.".to_string(),
        is_approved: approved,
        created_at: epoch(),
    }
}

/// A booking row to seed directly.
#[must_use]
pub fn new_booking(item: CatalogRef, status: BookingStatus, created_at: DateTime<Utc>) -> NewBooking {
    NewBooking {
        user_id: None,
        item,
        contact: contact(),
        booking_date: travel_date(),
        participants: Participants::adults_only(2),
        total_price: Money::from_cents(20_000),
        status,
        confirmation_code: ConfirmationCode::random(),
        special_requests: String::new(),
        admin_notes: String::new(),
        created_at,
    }
}

/// Checkout metadata matching [`checkout_form`].
#[must_use]
pub fn metadata(item: CatalogRef, participants: u32) -> CheckoutMetadata {
    CheckoutMetadata {
        item,
        participants,
        booking_date: travel_date(),
        customer_name: contact().name,
        customer_email: contact().email,
        customer_phone: contact().phone,
        special_requests: String::new(),
    }
}

fn intent_object(
    intent_id: &str,
    amount: Money,
    metadata: Option<&CheckoutMetadata>,
    failure: Option<&str>,
) -> serde_json::Value {
    let metadata: serde_json::Map<String, serde_json::Value> = metadata
        .map(|m| {
            m.to_pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect()
        })
        .unwrap_or_default();
    json!({
        "id": intent_id,
        "object": "payment_intent",
        "amount": amount.cents(),
        "currency": "eur",
        "latest_charge": format!("ch_{intent_id}"),
        "metadata": metadata,
        "last_payment_error": failure.map(|message| json!({ "message": message })),
    })
}

fn event_body(event_id: &str, event_type: &str, object: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": event_id,
        "object": "event",
        "type": event_type,
        "data": { "object": object },
    }))
    .unwrap()
}

/// `payment_intent.succeeded` body.
#[must_use]
pub fn payment_succeeded(
    event_id: &str,
    intent_id: &str,
    amount: Money,
    metadata: &CheckoutMetadata,
) -> Vec<u8> {
    event_body(
        event_id,
        "payment_intent.succeeded",
        intent_object(intent_id, amount, Some(metadata), None),
    )
}

/// `payment_intent.payment_failed` body.
#[must_use]
pub fn payment_failed(
    event_id: &str,
    intent_id: &str,
    amount: Money,
    metadata: &CheckoutMetadata,
    reason: &str,
) -> Vec<u8> {
    event_body(
        event_id,
        "payment_intent.payment_failed",
        intent_object(intent_id, amount, Some(metadata), Some(reason)),
    )
}

/// `charge.refunded` body for the charge of `intent_id`.
#[must_use]
pub fn charge_refunded(event_id: &str, intent_id: &str) -> Vec<u8> {
    event_body(
        event_id,
        "charge.refunded",
        json!({
            "id": format!("ch_{intent_id}"),
            "object": "charge",
            "payment_intent": intent_id,
        }),
    )
}

/// An event type the backend does not handle.
#[must_use]
pub fn unhandled_event(event_id: &str) -> Vec<u8> {
    event_body(event_id, "customer.created", json!({ "id": "cus_1" }))
}

/// `stripe-signature` header value for `payload` signed at `timestamp`.
#[must_use]
pub fn signature_header(payload: &[u8], timestamp: i64) -> String {
    format!(
        "t={timestamp},v1={}",
        sign(WEBHOOK_SECRET, timestamp, payload).unwrap()
    )
}

/// Name of the signature header.
#[must_use]
pub const fn signature_header_name() -> &'static str {
    SIGNATURE_HEADER
}

/// All services wired over one in-memory store, a fixed clock and recording mocks.
#[derive(Clone)]
pub struct TestContext {
    /// Shared store
    pub store: InMemoryStore,
    /// Captured e-mails
    pub notifier: RecordingNotifier,
    /// Captured checkout requests
    pub provider: MockPaymentProvider,
    /// Shared clock, 2025-01-01T00:00:00Z initially
    pub clock: FixedClock,
    /// Confirmation codes
    pub codes: SequenceCodeGenerator,
    /// Storefront
    pub catalog: CatalogService,
    /// Inquiries
    pub inquiries: InquiryService,
    /// Checkout
    pub checkout: CheckoutService,
    /// Webhook reconciliation
    pub reconciliation: ReconciliationService,
    /// Reviews
    pub reviews: ReviewService,
    /// Dashboard
    pub dashboard: DashboardService,
    /// Staff booking actions
    pub staff: BookingAdminService,
    /// Webhook authentication with [`WEBHOOK_SECRET`]
    pub verifier: WebhookVerifier,
}

impl TestContext {
    /// Context with the default failure policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(FailurePolicy::default())
    }

    /// Context with an explicit payment failure policy.
    #[must_use]
    pub fn with_policy(policy: FailurePolicy) -> Self {
        let store = InMemoryStore::new();
        let notifier = RecordingNotifier::new();
        let provider = MockPaymentProvider::new();
        let clock = test_clock();
        let codes = SequenceCodeGenerator::default();
        let calendar = SiteCalendar::utc();
        let effects = EffectRunner::new(Arc::new(notifier.clone()));
        let shared = Arc::new(store.clone());
        let clock_ref: Arc<dyn Clock> = Arc::new(clock.clone());
        let codes_ref = Arc::new(codes.clone());

        Self {
            catalog: CatalogService::new(shared.clone(), shared.clone()),
            inquiries: InquiryService::new(
                shared.clone(),
                shared.clone(),
                Arc::clone(&clock_ref),
                codes_ref.clone(),
                calendar,
                effects.clone(),
            ),
            checkout: CheckoutService::new(
                shared.clone(),
                Arc::new(provider.clone()),
                Arc::clone(&clock_ref),
                calendar,
            ),
            reconciliation: ReconciliationService::new(
                shared.clone(),
                shared.clone(),
                Arc::clone(&clock_ref),
                codes_ref,
                policy,
                effects.clone(),
            ),
            reviews: ReviewService::new(shared.clone(), shared.clone()),
            dashboard: DashboardService::new(
                shared.clone(),
                shared.clone(),
                shared.clone(),
                Arc::clone(&clock_ref),
                calendar,
            ),
            staff: BookingAdminService::new(shared, Arc::clone(&clock_ref), effects),
            verifier: WebhookVerifier::new(WEBHOOK_SECRET, Duration::minutes(5), clock_ref),
            store,
            notifier,
            provider,
            clock,
            codes,
        }
    }

    /// Current test time as a unix timestamp.
    #[must_use]
    pub fn now_timestamp(&self) -> i64 {
        self.clock.now().timestamp()
    }

    /// Signs `payload` at the current test time.
    #[must_use]
    pub fn sign(&self, payload: &[u8]) -> String {
        signature_header(payload, self.now_timestamp())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
