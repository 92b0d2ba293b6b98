//! Hosted checkout sessions.
//!
//! No booking or payment row is written here. The booking is created when the payment
//! webhook arrives, from the metadata attached to the session.

use super::resolve_active;
use crate::environment::{Clock, SiteCalendar};
use crate::error::BookingError;
use crate::metrics::CHECKOUT_SESSIONS_TOTAL;
use crate::pricing::{billed_quantity, price_for};
use crate::provider::{
    CheckoutMetadata, CheckoutSession, CheckoutSessionRequest, LineItem, PaymentProvider,
};
use crate::repository::CatalogRepository;
use crate::validation::{CheckoutForm, FieldErrors};
use std::sync::Arc;

/// Placeholder the provider replaces with the session id in the success URL.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Success redirect for a request origin such as `https://ausflugagypten.com`.
#[must_use]
pub fn success_url(origin: &str) -> String {
    format!(
        "{}/bookings/success/?session_id={SESSION_ID_PLACEHOLDER}",
        origin.trim_end_matches('/')
    )
}

/// Cancel redirect for a request origin.
#[must_use]
pub fn cancel_url(origin: &str) -> String {
    format!("{}/bookings/cancel/", origin.trim_end_matches('/'))
}

/// Builds checkout sessions with the payment provider.
#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<dyn CatalogRepository>,
    provider: Arc<dyn PaymentProvider>,
    clock: Arc<dyn Clock>,
    calendar: SiteCalendar,
}

impl CheckoutService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        provider: Arc<dyn PaymentProvider>,
        clock: Arc<dyn Clock>,
        calendar: SiteCalendar,
    ) -> Self {
        Self {
            catalog,
            provider,
            clock,
            calendar,
        }
    }

    /// Validates the request and creates a session whose redirects point back at
    /// `origin`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for bad input
    /// - [`BookingError::NotFound`] if the item is missing or inactive
    /// - [`BookingError::ExternalProvider`] if the provider call fails
    pub async fn create_session(
        &self,
        form: &CheckoutForm,
        origin: &str,
    ) -> Result<CheckoutSession, BookingError> {
        let result = self.build_and_send(form, origin).await;
        let outcome = match &result {
            Ok(_) => "created",
            Err(BookingError::ExternalProvider(_)) => "provider_error",
            Err(_) => "rejected",
        };
        metrics::counter!(CHECKOUT_SESSIONS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn build_and_send(
        &self,
        form: &CheckoutForm,
        origin: &str,
    ) -> Result<CheckoutSession, BookingError> {
        let today = self.calendar.today(self.clock.now());
        let request = form.validate(today)?;
        let item = resolve_active(self.catalog.as_ref(), request.item).await?;
        let participants = request.participants.total();

        let unit_amount = item.unit_price();
        if unit_amount.is_zero() {
            return Err(FieldErrors::single("item", "This item cannot be paid online.").into());
        }
        // Rejects totals the provider could not represent either.
        price_for(&item, participants).map_err(|e| FieldErrors::single("participants", e.to_string()))?;

        let session_request = CheckoutSessionRequest {
            line_items: vec![LineItem {
                name: item.title.clone(),
                unit_amount,
                quantity: billed_quantity(item.pricing, participants),
            }],
            success_url: success_url(origin),
            cancel_url: cancel_url(origin),
            customer_email: request.contact.email.clone(),
            metadata: CheckoutMetadata {
                item: request.item,
                participants,
                booking_date: request.booking_date,
                customer_name: request.contact.name,
                customer_email: request.contact.email,
                customer_phone: request.contact.phone,
                special_requests: request.special_requests,
            },
        };

        let session = self
            .provider
            .create_checkout_session(session_request)
            .await
            .map_err(|error| {
                tracing::error!(%error, item = %item.reference(), "checkout session failed");
                BookingError::from(error)
            })?;
        tracing::info!(session_id = %session.id, item = %item.reference(), participants, "checkout session created");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_urls_follow_origin() {
        assert_eq!(
            success_url("https://ausflugagypten.com/"),
            "https://ausflugagypten.com/bookings/success/?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            cancel_url("http://localhost:8080"),
            "http://localhost:8080/bookings/cancel/"
        );
    }
}
