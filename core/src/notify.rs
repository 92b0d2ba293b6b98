//! Outgoing e-mail notifications.
//!
//! Notifications are described as [`OutgoingEmail`] values and delivered by a
//! [`Notifier`]. Delivery failures are never fatal: the booking they refer to is already
//! persisted, so the runtime only logs and counts them.

use crate::booking::Booking;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Who receives a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// The customer's own address
    Customer(String),
    /// The configured staff inbox
    Staff,
}

/// A rendered plain-text e-mail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Recipient
    pub to: Recipient,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Delivery failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The message could not be built (bad address, header)
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The transport rejected or failed to deliver the message
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// Sends e-mails.
pub trait Notifier: Send + Sync {
    /// Delivers one message.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message cannot be built or delivered.
    fn send(
        &self,
        email: OutgoingEmail,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}

/// Logs e-mails instead of sending them. Used when no SMTP host is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send(
        &self,
        email: OutgoingEmail,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            let to = match &email.to {
                Recipient::Customer(address) => address.as_str(),
                Recipient::Staff => "staff",
            };
            tracing::info!(
                to = %to,
                subject = %email.subject,
                body = %email.body,
                "email (console notifier)"
            );
            Ok(())
        })
    }
}

/// Message templates.
pub mod messages {
    use super::{Booking, OutgoingEmail, Recipient};

    fn summary(booking: &Booking, item_title: &str) -> String {
        format!(
            "Confirmation code: {code}\nItem: {item_title}\nDate: {date}\nParticipants: {n}\nTotal: {total} EUR\nStatus: {status}",
            code = booking.confirmation_code,
            date = booking.booking_date.format("%d.%m.%Y"),
            n = booking.number_of_participants,
            total = booking.total_price,
            status = booking.status,
        )
    }

    fn customer(booking: &Booking) -> Recipient {
        Recipient::Customer(booking.contact.email.clone())
    }

    /// Acknowledgement to the customer and alert to staff after a new inquiry.
    #[must_use]
    pub fn inquiry_received(booking: &Booking, item_title: &str) -> Vec<OutgoingEmail> {
        let details = summary(booking, item_title);
        vec![
            OutgoingEmail {
                to: customer(booking),
                subject: format!("Your booking request {}", booking.confirmation_code),
                body: format!(
                    "Hello {},\n\nthank you for your request. We will get back to you shortly.\n\n{details}",
                    booking.contact.name
                ),
            },
            OutgoingEmail {
                to: Recipient::Staff,
                subject: format!("New booking request {}", booking.confirmation_code),
                body: format!(
                    "{details}\n\nCustomer: {} <{}>, {}\nSpecial requests: {}",
                    booking.contact.name,
                    booking.contact.email,
                    booking.contact.phone,
                    booking.special_requests
                ),
            },
        ]
    }

    /// Receipt to the customer and alert to staff after a captured payment.
    #[must_use]
    pub fn payment_confirmed(booking: &Booking, item_title: &str) -> Vec<OutgoingEmail> {
        let details = summary(booking, item_title);
        vec![
            OutgoingEmail {
                to: customer(booking),
                subject: format!("Payment received for booking {}", booking.confirmation_code),
                body: format!(
                    "Hello {},\n\nwe received your payment. Your booking is confirmed.\n\n{details}",
                    booking.contact.name
                ),
            },
            OutgoingEmail {
                to: Recipient::Staff,
                subject: format!("Paid booking {}", booking.confirmation_code),
                body: format!(
                    "{details}\n\nCustomer: {} <{}>, {}",
                    booking.contact.name, booking.contact.email, booking.contact.phone
                ),
            },
        ]
    }

    /// Status update to the customer after a staff or payment-driven change.
    #[must_use]
    pub fn status_changed(booking: &Booking) -> OutgoingEmail {
        OutgoingEmail {
            to: customer(booking),
            subject: format!(
                "Booking {} is now {}",
                booking.confirmation_code, booking.status
            ),
            body: format!(
                "Hello {},\n\nthe status of your booking {} changed to {}.",
                booking.contact.name, booking.confirmation_code, booking.status
            ),
        }
    }

    /// Staff alert for a payment that arrived for a booking that cannot be confirmed.
    #[must_use]
    pub fn payment_needs_attention(booking: &Booking, reason: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: Recipient::Staff,
            subject: format!("Payment for booking {} needs attention", booking.confirmation_code),
            body: format!(
                "Booking {} ({}) received a payment event that could not be applied: {reason}",
                booking.confirmation_code, booking.status
            ),
        }
    }
}
