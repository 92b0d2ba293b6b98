//! Error types shared by the services and their adapters.

use crate::booking::BookingStatus;
use crate::payment::PaymentStatus;
use crate::provider::ProviderError;
use crate::validation::FieldErrors;
use thiserror::Error;

/// Errors raised by repository implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint
        constraint: String,
    },

    /// The row changed after it was read
    #[error("{record} was modified concurrently (expected version {expected})")]
    ConcurrencyConflict {
        /// Table and id, e.g. `booking 7`
        record: String,
        /// Version the writer read
        expected: i64,
    },

    /// The row to update does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    /// A stored value could not be mapped back to a domain type
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Connection, query or transaction failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Conflict on `record`, read at version `expected`.
    #[must_use]
    pub fn conflict(record: impl std::fmt::Display, expected: i64) -> Self {
        Self::ConcurrencyConflict {
            record: record.to_string(),
            expected,
        }
    }

    /// Whether another writer got there first.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Whether this is a unique violation of `constraint`.
    #[must_use]
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint: c } if c == constraint)
    }
}

/// A rejected status change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Booking status change not allowed
    #[error("booking cannot move from {from} to {to}")]
    Booking {
        /// Current status
        from: BookingStatus,
        /// Requested status
        to: BookingStatus,
    },

    /// Payment status change not allowed
    #[error("payment cannot move from {from} to {to}")]
    Payment {
        /// Current status
        from: PaymentStatus,
        /// Requested status
        to: PaymentStatus,
    },
}

/// Errors returned by the booking, checkout and review services.
#[derive(Error, Debug)]
pub enum BookingError {
    /// Bad or missing input fields
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Referenced item or record is missing or inactive
    #[error("not found: {0}")]
    NotFound(String),

    /// The payment provider failed or rejected the request
    #[error("payment provider error: {0}")]
    ExternalProvider(String),

    /// A unique constraint could not be satisfied
    #[error("integrity error: {0}")]
    Integrity(String),

    /// A status change was not allowed
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Storage failure
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation { constraint } => {
                Self::Integrity(format!("unique constraint {constraint} violated"))
            }
            conflict @ StoreError::ConcurrencyConflict { .. } => {
                Self::Integrity(conflict.to_string())
            }
            other => Self::Store(other),
        }
    }
}

impl From<FieldErrors> for BookingError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<ProviderError> for BookingError {
    fn from(error: ProviderError) -> Self {
        Self::ExternalProvider(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_becomes_integrity_error() {
        let err = BookingError::from(StoreError::UniqueViolation {
            constraint: "payments_payment_intent_id_key".to_string(),
        });
        assert!(matches!(err, BookingError::Integrity(_)));

        let err = BookingError::from(StoreError::Backend("connection reset".to_string()));
        assert!(matches!(err, BookingError::Store(_)));
    }

    #[test]
    fn exhausted_conflict_is_an_integrity_error() {
        let conflict = StoreError::conflict("booking 7", 3);
        assert!(conflict.is_conflict());
        assert_eq!(
            conflict.to_string(),
            "booking 7 was modified concurrently (expected version 3)"
        );
        assert!(matches!(BookingError::from(conflict), BookingError::Integrity(_)));
    }

    #[test]
    fn violates_matches_constraint_name() {
        let err = StoreError::UniqueViolation {
            constraint: "a".to_string(),
        };
        assert!(err.violates("a"));
        assert!(!err.violates("b"));
        assert!(!StoreError::NotFound("x".to_string()).violates("a"));
    }
}
