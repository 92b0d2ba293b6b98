//! Payment provider port.
//!
//! The checkout flow only needs one call: create a hosted checkout session. Everything
//! the webhook later needs to create the booking travels in the session metadata.

use crate::catalog::{CatalogKind, CatalogRef};
use crate::money::Money;
use crate::validation::{MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Longest value, in characters, the provider accepts for one metadata key.
pub const MAX_METADATA_VALUE_LEN: usize = 500;

/// One billed line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    /// Product name shown on the payment page
    pub name: String,
    /// Price of one unit
    pub unit_amount: Money,
    /// Units billed
    pub quantity: u32,
}

/// Booking details carried through the provider and back in the webhook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutMetadata {
    /// Booked item
    pub item: CatalogRef,
    /// Head count
    pub participants: u32,
    /// Travel date
    pub booking_date: NaiveDate,
    /// Contact name
    pub customer_name: String,
    /// Contact e-mail
    pub customer_email: String,
    /// Contact phone
    pub customer_phone: String,
    /// Customer notes
    pub special_requests: String,
}

/// Why metadata could not be read back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// A key is absent
    #[error("metadata key {0} is missing")]
    Missing(&'static str),

    /// A key has an unusable value
    #[error("metadata key {key} has invalid value {value:?}")]
    Invalid {
        /// Key
        key: &'static str,
        /// Raw value
        value: String,
    },
}

impl CheckoutMetadata {
    /// Flattens into provider metadata pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("item_kind", self.item.kind().as_str().to_string()),
            ("item_id", self.item.id().to_string()),
            ("participants", self.participants.to_string()),
            ("booking_date", self.booking_date.format("%Y-%m-%d").to_string()),
            ("customer_name", self.customer_name.clone()),
            ("customer_email", self.customer_email.clone()),
            ("customer_phone", self.customer_phone.clone()),
            ("special_requests", self.special_requests.clone()),
        ]
    }

    /// Reads metadata echoed back by the provider. A bare `tour_id` is accepted for
    /// sessions created before items carried a kind.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] for missing or malformed keys, including a head count
    /// outside the bookable range.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, MetadataError> {
        fn get<'a>(
            map: &'a HashMap<String, String>,
            key: &'static str,
        ) -> Result<&'a str, MetadataError> {
            map.get(key)
                .map(String::as_str)
                .ok_or(MetadataError::Missing(key))
        }
        fn invalid(key: &'static str, value: &str) -> MetadataError {
            MetadataError::Invalid {
                key,
                value: value.to_string(),
            }
        }

        let item = if let Some(tour_id) = map.get("tour_id").filter(|_| !map.contains_key("item_kind")) {
            let id = tour_id.parse().map_err(|_| invalid("tour_id", tour_id))?;
            CatalogRef::Tour(id)
        } else {
            let kind_raw = get(map, "item_kind")?;
            let kind = CatalogKind::parse(kind_raw).ok_or_else(|| invalid("item_kind", kind_raw))?;
            let id_raw = get(map, "item_id")?;
            let id = id_raw.parse().map_err(|_| invalid("item_id", id_raw))?;
            CatalogRef::new(kind, id)
        };

        let participants_raw = get(map, "participants")?;
        let participants = participants_raw
            .parse::<u32>()
            .ok()
            .filter(|n| (MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(n))
            .ok_or_else(|| invalid("participants", participants_raw))?;

        let date_raw = get(map, "booking_date")?;
        let booking_date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .map_err(|_| invalid("booking_date", date_raw))?;

        let customer_email = get(map, "customer_email")?.to_string();
        if customer_email.is_empty() {
            return Err(invalid("customer_email", &customer_email));
        }

        Ok(Self {
            item,
            participants,
            booking_date,
            customer_name: get(map, "customer_name")?.to_string(),
            customer_email,
            customer_phone: map.get("customer_phone").cloned().unwrap_or_default(),
            special_requests: map.get("special_requests").cloned().unwrap_or_default(),
        })
    }
}

/// Input of a checkout session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    /// Billed lines
    pub line_items: Vec<LineItem>,
    /// Redirect after payment; may contain the provider's session id placeholder
    pub success_url: String,
    /// Redirect when the customer aborts
    pub cancel_url: String,
    /// Prefills the payment page
    pub customer_email: String,
    /// Echoed back in webhook events
    pub metadata: CheckoutMetadata,
}

/// A created checkout session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Opaque session id
    pub id: String,
    /// Hosted payment page
    pub url: Option<String>,
}

/// Provider call failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network or TLS failure
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with an error
    #[error("provider returned {status}: {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// Provider message
        message: String,
    },

    /// The answer could not be understood
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Payment provider trait
///
/// Abstracts the hosted checkout of the payment provider. Production uses Stripe; tests
/// use a mock that records requests.
pub trait PaymentProvider: Send + Sync {
    /// Creates a hosted checkout session.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport or API failure.
    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CheckoutSession, ProviderError>> + Send + '_>>;
}
