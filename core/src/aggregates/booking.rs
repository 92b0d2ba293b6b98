//! Booking aggregate.
//!
//! Every status change of a persisted booking goes through [`BookingReducer`], whether it
//! is triggered by staff or by a payment webhook. Rejected transitions leave the booking
//! untouched and are reported through [`BookingState::last_error`].

use crate::booking::{Booking, BookingStatus};
use crate::effect::Effect;
use crate::environment::Clock;
use crate::error::TransitionError;
use crate::notify::messages;
use crate::reducer::Reducer;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

// ============================================================================
// Actions
// ============================================================================

/// Commands accepted by a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingAction {
    /// Staff confirms a pending booking
    Confirm,
    /// The provider captured the payment for this booking
    PaymentReceived {
        /// Title of the booked item, for the receipt
        item_title: String,
    },
    /// Cancel the booking
    Cancel {
        /// Reason, appended to the admin notes
        reason: Option<String>,
    },
    /// Trip took place
    Complete,
    /// Append a staff note
    AnnotateAdmin {
        /// Note text
        note: String,
    },
}

// ============================================================================
// State
// ============================================================================

/// A booking plus the outcome of the last action.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingState {
    /// Current booking
    pub booking: Booking,
    /// Set when the last action was rejected
    pub last_error: Option<TransitionError>,
}

impl BookingState {
    /// Wraps a loaded booking.
    #[must_use]
    pub const fn new(booking: Booking) -> Self {
        Self {
            booking,
            last_error: None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the Booking aggregate
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the booking lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Moves to `to` if allowed, recording the error otherwise. Returns whether it moved.
    fn transition(state: &mut BookingState, to: BookingStatus, env: &BookingEnvironment) -> bool {
        let from = state.booking.status;
        if !from.can_transition_to(to) {
            state.last_error = Some(TransitionError::Booking { from, to });
            return false;
        }
        state.booking.status = to;
        state.booking.updated_at = env.clock.now();
        state.last_error = None;
        true
    }

    fn append_note(booking: &mut Booking, note: &str) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        if !booking.admin_notes.is_empty() {
            booking.admin_notes.push('\n');
        }
        booking.admin_notes.push_str(note);
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        match action {
            BookingAction::Confirm => {
                if !Self::transition(state, BookingStatus::Confirmed, env) {
                    return SmallVec::new();
                }
                smallvec![Effect::Notify(messages::status_changed(&state.booking))]
            }

            BookingAction::PaymentReceived { item_title } => {
                if !Self::transition(state, BookingStatus::Confirmed, env) {
                    return SmallVec::new();
                }
                smallvec![Effect::notify_all(messages::payment_confirmed(
                    &state.booking,
                    &item_title
                ))]
            }

            BookingAction::Cancel { reason } => {
                if !Self::transition(state, BookingStatus::Cancelled, env) {
                    return SmallVec::new();
                }
                if let Some(reason) = reason {
                    Self::append_note(&mut state.booking, &format!("Cancelled: {reason}"));
                }
                smallvec![Effect::Notify(messages::status_changed(&state.booking))]
            }

            BookingAction::Complete => {
                if !Self::transition(state, BookingStatus::Completed, env) {
                    return SmallVec::new();
                }
                smallvec![Effect::Notify(messages::status_changed(&state.booking))]
            }

            BookingAction::AnnotateAdmin { note } => {
                Self::append_note(&mut state.booking, &note);
                state.booking.updated_at = env.clock.now();
                state.last_error = None;
                SmallVec::new()
            }
        }
    }
}
