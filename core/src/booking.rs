//! Bookings and their lifecycle states.

use crate::catalog::{CatalogItem, CatalogKind, CatalogRef};
use crate::confirmation::ConfirmationCode;
use crate::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database id of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(i64);

impl BookingId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Booking status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting confirmation
    Pending,
    /// Confirmed by staff or by payment
    Confirmed,
    /// Cancelled
    Cancelled,
    /// Trip took place
    Completed,
}

impl BookingStatus {
    /// Storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Parses the storage name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether a booking in this status may move to `next`.
    ///
    /// `pending → confirmed`, `confirmed → completed`, and any status except
    /// `cancelled` may be cancelled.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Confirmed, Self::Completed)
                | (Self::Pending | Self::Confirmed | Self::Completed, Self::Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Participant breakdown by age group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    /// Adults
    pub adults: u32,
    /// Children
    pub children: u32,
    /// Babies
    pub babies: u32,
}

impl Participants {
    /// A group made of `count` adults.
    #[must_use]
    pub const fn adults_only(count: u32) -> Self {
        Self {
            adults: count,
            children: 0,
            babies: 0,
        }
    }

    /// Total head count.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.adults
            .saturating_add(self.children)
            .saturating_add(self.babies)
    }
}

/// Customer contact details. All three are required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Full name
    pub name: String,
    /// E-mail address
    pub email: String,
    /// Phone number
    pub phone: String,
}

/// A persisted booking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Database id
    pub id: BookingId,
    /// Owning account, `None` for guest bookings
    pub user_id: Option<i64>,
    /// The booked item
    pub item: CatalogRef,
    /// Customer contact
    pub contact: Contact,
    /// Travel date
    pub booking_date: NaiveDate,
    /// Breakdown by age group
    pub participants: Participants,
    /// Redundant head count, always `participants.total()`
    pub number_of_participants: u32,
    /// Computed total
    pub total_price: Money,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Public code
    pub confirmation_code: ConfirmationCode,
    /// Customer notes
    pub special_requests: String,
    /// Staff notes
    pub admin_notes: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
    /// Row version; every update must present the version it read
    pub version: i64,
}

/// A booking about to be inserted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBooking {
    /// Owning account
    pub user_id: Option<i64>,
    /// The booked item
    pub item: CatalogRef,
    /// Customer contact
    pub contact: Contact,
    /// Travel date
    pub booking_date: NaiveDate,
    /// Breakdown by age group
    pub participants: Participants,
    /// Computed total
    pub total_price: Money,
    /// Initial status
    pub status: BookingStatus,
    /// Public code, replaced on collision
    pub confirmation_code: ConfirmationCode,
    /// Customer notes
    pub special_requests: String,
    /// Staff notes
    pub admin_notes: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    /// The redundant head count stored next to the breakdown.
    #[must_use]
    pub const fn number_of_participants(&self) -> u32 {
        self.participants.total()
    }

    /// Materializes the row once the store has assigned an id.
    #[must_use]
    pub fn into_booking(self, id: BookingId) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            item: self.item,
            number_of_participants: self.participants.total(),
            contact: self.contact,
            booking_date: self.booking_date,
            participants: self.participants,
            total_price: self.total_price,
            status: self.status,
            confirmation_code: self.confirmation_code,
            special_requests: self.special_requests,
            admin_notes: self.admin_notes,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 1,
        }
    }
}

/// What the public confirmation page shows. Carries no contact data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationView {
    /// Public code
    pub confirmation_code: ConfirmationCode,
    /// Status
    pub status: BookingStatus,
    /// Kind of the booked item
    pub item_kind: CatalogKind,
    /// Title of the booked item, if it still exists
    pub item_title: Option<String>,
    /// Travel date
    pub booking_date: NaiveDate,
    /// Head count
    pub number_of_participants: u32,
    /// Total
    pub total_price: Money,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl ConfirmationView {
    /// Projects a booking onto its public view.
    #[must_use]
    pub fn new(booking: &Booking, item: Option<&CatalogItem>) -> Self {
        Self {
            confirmation_code: booking.confirmation_code.clone(),
            status: booking.status,
            item_kind: booking.item.kind(),
            item_title: item.map(|i| i.title.clone()),
            booking_date: booking.booking_date,
            number_of_participants: booking.number_of_participants,
            total_price: booking.total_price,
            created_at: booking.created_at,
        }
    }
}
