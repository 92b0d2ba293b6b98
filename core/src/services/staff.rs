//! Staff-driven booking status changes.

use super::retry_on_conflict;
use crate::aggregates::{BookingAction, BookingEnvironment, BookingReducer, BookingState};
use crate::booking::{Booking, BookingId, BookingStatus};
use crate::environment::Clock;
use crate::error::{BookingError, TransitionError};
use crate::metrics::BOOKING_TRANSITIONS_TOTAL;
use crate::reducer::Reducer;
use crate::repository::BookingRepository;
use crate::runtime::EffectRunner;
use std::sync::Arc;

/// Lists bookings and applies staff transitions through the booking reducer.
#[derive(Clone)]
pub struct BookingAdminService {
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    effects: EffectRunner,
}

impl BookingAdminService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        effects: EffectRunner,
    ) -> Self {
        Self {
            bookings,
            clock,
            effects,
        }
    }

    /// Newest bookings, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] on storage failure.
    pub async fn recent(
        &self,
        status: Option<BookingStatus>,
        limit: u32,
    ) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.recent(status, limit).await?)
    }

    /// Moves a booking to `target`, recording `note` in the admin notes.
    ///
    /// A booking changed by someone else between read and write is re-read and the
    /// transition re-checked against its new status.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for unknown ids
    /// - [`BookingError::InvalidTransition`] if the lifecycle forbids the change
    /// - [`BookingError::Integrity`] if the booking kept changing underneath
    pub async fn transition(
        &self,
        id: BookingId,
        target: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, BookingError> {
        let conflicted = |err: &BookingError| matches!(err, BookingError::Store(e) if e.is_conflict());
        match retry_on_conflict(conflicted, || self.try_transition(id, target, note.clone())).await {
            Err(BookingError::Store(store)) => Err(store.into()),
            other => other,
        }
    }

    /// One read-reduce-write round. Storage errors stay wrapped in
    /// [`BookingError::Store`] so conflicts can be told apart.
    async fn try_transition(
        &self,
        id: BookingId,
        target: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .bookings
            .find(id)
            .await
            .map_err(BookingError::Store)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {id} does not exist")))?;
        let from = booking.status;
        let env = BookingEnvironment::new(Arc::clone(&self.clock));
        let mut state = BookingState::new(booking);

        let action = match target {
            BookingStatus::Confirmed => BookingAction::Confirm,
            BookingStatus::Completed => BookingAction::Complete,
            BookingStatus::Cancelled => BookingAction::Cancel {
                reason: note.clone(),
            },
            BookingStatus::Pending => {
                return Err(TransitionError::Booking { from, to: target }.into());
            }
        };
        let effects = BookingReducer.reduce(&mut state, action, &env);
        if let Some(error) = state.last_error.take() {
            return Err(error.into());
        }
        if target != BookingStatus::Cancelled {
            if let Some(note) = note {
                BookingReducer.reduce(&mut state, BookingAction::AnnotateAdmin { note }, &env);
            }
        }

        self.bookings
            .update(&state.booking)
            .await
            .map_err(BookingError::Store)?;
        state.booking.version += 1;
        metrics::counter!(BOOKING_TRANSITIONS_TOTAL, "to" => target.as_str()).increment(1);
        tracing::info!(
            confirmation_code = %state.booking.confirmation_code,
            from = %from,
            to = %target,
            "booking status changed by staff"
        );
        self.effects.run(effects).await;
        Ok(state.booking)
    }
}
