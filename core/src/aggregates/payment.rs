//! Payment aggregate.
//!
//! Applies provider-reported outcomes to a stored payment. A succeeded payment can only
//! be refunded, so a late failure event never undoes a capture.

use crate::effect::Effect;
use crate::environment::Clock;
use crate::error::TransitionError;
use crate::payment::{Payment, PaymentStatus};
use crate::reducer::Reducer;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Provider outcomes applied to a payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentAction {
    /// Provider started processing
    StartProcessing,
    /// Money captured
    Succeed {
        /// Provider charge id, if reported
        charge_id: Option<String>,
    },
    /// Attempt failed
    Fail {
        /// Provider message
        reason: String,
    },
    /// Money returned to the customer
    Refund,
}

/// A payment plus the outcome of the last action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentState {
    /// Current payment
    pub payment: Payment,
    /// Set when the last action was rejected
    pub last_error: Option<TransitionError>,
}

impl PaymentState {
    /// Wraps a loaded payment.
    #[must_use]
    pub const fn new(payment: Payment) -> Self {
        Self {
            payment,
            last_error: None,
        }
    }
}

/// Environment dependencies for the Payment aggregate
#[derive(Clone)]
pub struct PaymentEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
}

impl PaymentEnvironment {
    /// Creates a new `PaymentEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

/// Reducer for the payment lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentReducer;

impl Reducer for PaymentReducer {
    type State = PaymentState;
    type Action = PaymentAction;
    type Environment = PaymentEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect; 4]> {
        let to = match &action {
            PaymentAction::StartProcessing => PaymentStatus::Processing,
            PaymentAction::Succeed { .. } => PaymentStatus::Succeeded,
            PaymentAction::Fail { .. } => PaymentStatus::Failed,
            PaymentAction::Refund => PaymentStatus::Refunded,
        };
        let from = state.payment.status;
        if !from.can_transition_to(to) {
            state.last_error = Some(TransitionError::Payment { from, to });
            return SmallVec::new();
        }

        let now = env.clock.now();
        let payment = &mut state.payment;
        payment.status = to;
        payment.updated_at = now;
        match action {
            PaymentAction::Succeed { charge_id } => {
                payment.paid_at = Some(now);
                payment.failure_reason = None;
                if charge_id.is_some() {
                    payment.charge_id = charge_id;
                }
            }
            PaymentAction::Fail { reason } => payment.failure_reason = Some(reason),
            PaymentAction::StartProcessing | PaymentAction::Refund => {}
        }
        state.last_error = None;
        SmallVec::new()
    }
}
