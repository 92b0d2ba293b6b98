//! Payments recorded against bookings.

use crate::booking::BookingId;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database id of a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(i64);

impl PaymentId {
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

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment status as reported by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Created, nothing reported yet
    Pending,
    /// Provider is processing
    Processing,
    /// Money captured
    Succeeded,
    /// Attempt failed
    Failed,
    /// Money returned
    Refunded,
}

impl PaymentStatus {
    /// Storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Parses the storage name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Whether a payment in this status may move to `next`.
    ///
    /// A failed attempt may be retried, and may fail again; a succeeded payment can only
    /// be refunded.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Succeeded | Self::Failed)
                | (Self::Processing, Self::Succeeded | Self::Failed)
                | (Self::Failed, Self::Processing | Self::Succeeded | Self::Failed)
                | (Self::Succeeded, Self::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted payment, one-to-one with a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Database id
    pub id: PaymentId,
    /// The paid booking
    pub booking_id: BookingId,
    /// Provider payment-intent id (unique)
    pub payment_intent_id: String,
    /// Provider charge id (unique when present)
    pub charge_id: Option<String>,
    /// Amount, mirrors the booking total
    pub amount: Money,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Status
    pub status: PaymentStatus,
    /// Last failure message from the provider
    pub failure_reason: Option<String>,
    /// When the money was captured
    pub paid_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
    /// Row version; every update must present the version it read
    pub version: i64,
}

/// A payment about to be inserted together with its booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPayment {
    /// Provider payment-intent id
    pub payment_intent_id: String,
    /// Provider charge id
    pub charge_id: Option<String>,
    /// Amount
    pub amount: Money,
    /// Currency
    pub currency: String,
    /// Initial status
    pub status: PaymentStatus,
    /// Failure message
    pub failure_reason: Option<String>,
    /// Capture time
    pub paid_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl NewPayment {
    /// Materializes the row once the store has assigned ids.
    #[must_use]
    pub fn into_payment(self, id: PaymentId, booking_id: BookingId) -> Payment {
        Payment {
            id,
            booking_id,
            payment_intent_id: self.payment_intent_id,
            charge_id: self.charge_id,
            amount: self.amount,
            currency: self.currency,
            status: self.status,
            failure_reason: self.failure_reason,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus::{Failed, Pending, Processing, Refunded, Succeeded};

    #[test]
    fn succeeded_never_regresses() {
        assert!(!Succeeded.can_transition_to(Failed));
        assert!(!Succeeded.can_transition_to(Pending));
        assert!(Succeeded.can_transition_to(Refunded));
    }

    #[test]
    fn failed_payment_may_be_retried() {
        assert!(Failed.can_transition_to(Succeeded));
        assert!(Failed.can_transition_to(Processing));
        assert!(Failed.can_transition_to(Failed));
        assert!(!Refunded.can_transition_to(Succeeded));
        assert!(Pending.can_transition_to(Failed));
    }
}
