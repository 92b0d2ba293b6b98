//! Booking inquiries: a no-payment request that staff confirm by hand.

use super::{resolve_active, with_fresh_code};
use crate::booking::{Booking, BookingStatus, ConfirmationView, NewBooking};
use crate::confirmation::ConfirmationCode;
use crate::effect::Effect;
use crate::environment::{Clock, CodeGenerator, SiteCalendar};
use crate::error::BookingError;
use crate::metrics::{INQUIRIES_REJECTED_TOTAL, INQUIRIES_TOTAL};
use crate::notify::messages;
use crate::pricing::price_for;
use crate::repository::{BookingRepository, CatalogRepository};
use crate::runtime::EffectRunner;
use crate::validation::{BookingRequest, FieldErrors, InquiryForm};
use std::sync::Arc;

/// Validates, prices and stores inquiries; serves the confirmation page.
#[derive(Clone)]
pub struct InquiryService {
    catalog: Arc<dyn CatalogRepository>,
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeGenerator>,
    calendar: SiteCalendar,
    effects: EffectRunner,
}

impl InquiryService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeGenerator>,
        calendar: SiteCalendar,
        effects: EffectRunner,
    ) -> Self {
        Self {
            catalog,
            bookings,
            clock,
            codes,
            calendar,
            effects,
        }
    }

    /// Submits an inquiry and returns the stored pending booking.
    ///
    /// Nothing is written unless validation passes and the item is active.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] with field messages
    /// - [`BookingError::NotFound`] if the item is missing or inactive
    /// - [`BookingError::Integrity`] if no free confirmation code was found
    /// - [`BookingError::Store`] on storage failure
    pub async fn submit(&self, form: &InquiryForm) -> Result<Booking, BookingError> {
        let today = self.calendar.today(self.clock.now());
        let result = match form.validate(today) {
            Ok(request) => self.create(request).await,
            Err(errors) => Err(BookingError::Validation(errors)),
        };
        if let Err(BookingError::Validation(_) | BookingError::NotFound(_)) = &result {
            metrics::counter!(INQUIRIES_REJECTED_TOTAL).increment(1);
        }
        result
    }

    async fn create(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let item = resolve_active(self.catalog.as_ref(), request.item).await?;
        let total_price = price_for(&item, request.participants.total())
            .map_err(|e| FieldErrors::single("persons", e.to_string()))?;

        let template = NewBooking {
            user_id: None,
            item: request.item,
            contact: request.contact,
            booking_date: request.booking_date,
            participants: request.participants,
            total_price,
            status: BookingStatus::Pending,
            confirmation_code: self.codes.next_code(),
            special_requests: request.special_requests,
            admin_notes: String::new(),
            created_at: self.clock.now(),
        };
        let bookings = &self.bookings;
        let booking = with_fresh_code(
            self.codes.as_ref(),
            template.confirmation_code.clone(),
            |code| {
                let mut candidate = template.clone();
                candidate.confirmation_code = code;
                bookings.insert(candidate)
            },
        )
        .await?;

        metrics::counter!(INQUIRIES_TOTAL, "kind" => item.kind.as_str()).increment(1);
        tracing::info!(
            confirmation_code = %booking.confirmation_code,
            item = %booking.item,
            participants = booking.number_of_participants,
            total = %booking.total_price,
            "inquiry stored"
        );

        self.effects
            .run([Effect::notify_all(messages::inquiry_received(
                &booking,
                &item.title,
            ))])
            .await;
        Ok(booking)
    }

    /// Public view of a booking by confirmation code.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] for malformed or unknown codes.
    pub async fn lookup(&self, code: &str) -> Result<ConfirmationView, BookingError> {
        let not_found = || BookingError::NotFound(format!("booking {code} does not exist"));
        let code = ConfirmationCode::parse(code.trim()).map_err(|_| not_found())?;
        let booking = self
            .bookings
            .find_by_code(&code)
            .await?
            .ok_or_else(not_found)?;
        let item = self.catalog.find(booking.item).await?;
        Ok(ConfirmationView::new(&booking, item.as_ref()))
    }
}
