//! Applies payment webhook events to bookings and payments.
//!
//! Reconciliation is idempotent. The provider event id is recorded in the same
//! transaction as the state change it caused, and a replayed id is answered with
//! [`ReconciliationOutcome::Duplicate`] without touching anything. Redelivered outcomes
//! under a new event id are absorbed by the payment state machine: a succeeded payment
//! is never created twice (unique payment intent) and never regresses to failed.

use super::{retry_on_conflict, with_fresh_code};
use crate::aggregates::{
    BookingAction, BookingEnvironment, BookingReducer, BookingState, PaymentAction,
    PaymentEnvironment, PaymentReducer, PaymentState,
};
use crate::booking::{Booking, BookingId, BookingStatus, Contact, NewBooking, Participants};
use crate::catalog::CatalogRef;
use crate::effect::Effect;
use crate::environment::{Clock, CodeGenerator};
use crate::error::{BookingError, StoreError};
use crate::metrics::{BOOKING_TRANSITIONS_TOTAL, WEBHOOK_EVENTS_TOTAL};
use crate::notify::messages;
use crate::payment::{NewPayment, Payment, PaymentId, PaymentStatus};
use crate::provider::CheckoutMetadata;
use crate::reducer::Reducer;
use crate::repository::{
    CatalogRepository, PROCESSED_EVENT_CONSTRAINT, PaymentRepository, ProcessedEvent,
};
use crate::runtime::EffectRunner;
use crate::webhook::{ChargeRefund, PaymentIntent, ProviderEvent, WebhookEvent};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// What happens to a booking whose payment failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Booking stays pending so the customer can retry or staff can follow up
    #[default]
    KeepPending,
    /// Booking is cancelled
    Cancel,
}

impl FailurePolicy {
    /// Configuration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeepPending => "keep_pending",
            Self::Cancel => "cancel",
        }
    }

    /// Parses the configuration name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "keep_pending" => Some(Self::KeepPending),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Result of applying one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Booking and payment were created from the session metadata
    Created {
        /// New booking
        booking: BookingId,
        /// New payment
        payment: PaymentId,
    },
    /// An existing payment (and possibly its booking) changed
    Updated {
        /// Affected booking
        booking: BookingId,
        /// Affected payment
        payment: PaymentId,
    },
    /// Already applied
    Duplicate,
    /// Recorded but nothing to change
    Ignored {
        /// Why nothing changed
        reason: String,
    },
}

impl ReconciliationOutcome {
    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Duplicate => "duplicate",
            Self::Ignored { .. } => "ignored",
        }
    }
}

/// Reconciles provider events with stored bookings and payments.
#[derive(Clone)]
pub struct ReconciliationService {
    payments: Arc<dyn PaymentRepository>,
    catalog: Arc<dyn CatalogRepository>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeGenerator>,
    policy: FailurePolicy,
    effects: EffectRunner,
}

impl ReconciliationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        catalog: Arc<dyn CatalogRepository>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeGenerator>,
        policy: FailurePolicy,
        effects: EffectRunner,
    ) -> Self {
        Self {
            payments,
            catalog,
            clock,
            codes,
            policy,
            effects,
        }
    }

    /// The configured failure policy.
    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Applies one authenticated event.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Integrity`] if the payment intent already exists on a concurrent
    ///   path; the provider's retry then takes the existing-payment path
    /// - [`BookingError::Integrity`] if the booking or payment kept changing underneath
    ///   (every attempt re-reads both rows)
    /// - [`BookingError::Store`] on storage failure, so the provider retries
    pub async fn reconcile(
        &self,
        event: WebhookEvent,
    ) -> Result<ReconciliationOutcome, BookingError> {
        let event_id = event.id.clone();
        let applied = retry_on_conflict(StoreError::is_conflict, || self.apply(event.clone())).await;
        let result = match applied {
            // A concurrent delivery of the same event committed first.
            Err(err) if err.violates(PROCESSED_EVENT_CONSTRAINT) => {
                Ok(ReconciliationOutcome::Duplicate)
            }
            other => other.map_err(BookingError::from),
        };

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(BookingError::Integrity(_)) => "integrity_error",
            Err(_) => "error",
        };
        metrics::counter!(WEBHOOK_EVENTS_TOTAL, "outcome" => label).increment(1);
        match &result {
            Ok(outcome) => tracing::info!(event_id = %event_id, outcome = label, ?outcome, "webhook event reconciled"),
            Err(error) => tracing::error!(event_id = %event_id, %error, "webhook event failed"),
        }
        result
    }

    async fn apply(&self, event: WebhookEvent) -> Result<ReconciliationOutcome, StoreError> {
        if self.payments.is_event_processed(&event.id).await? {
            return Ok(ReconciliationOutcome::Duplicate);
        }
        let marker = ProcessedEvent {
            event_id: event.id,
            event_type: event.event_type,
            processed_at: self.clock.now(),
        };

        match event.event {
            ProviderEvent::PaymentSucceeded(intent) => self.on_succeeded(intent, marker).await,
            ProviderEvent::PaymentFailed(intent) => self.on_failed(intent, marker).await,
            ProviderEvent::ChargeRefunded(refund) => self.on_refunded(refund, marker).await,
            ProviderEvent::Other(kind) => {
                self.ignore(marker, format!("unhandled event type {kind}")).await
            }
        }
    }

    async fn ignore(
        &self,
        marker: ProcessedEvent,
        reason: String,
    ) -> Result<ReconciliationOutcome, StoreError> {
        self.payments.mark_event_processed(marker).await?;
        Ok(ReconciliationOutcome::Ignored { reason })
    }

    async fn item_title(&self, item: CatalogRef) -> Result<String, StoreError> {
        Ok(self
            .catalog
            .find(item)
            .await?
            .map_or_else(|| item.to_string(), |found| found.title))
    }

    fn booking_env(&self) -> BookingEnvironment {
        BookingEnvironment::new(Arc::clone(&self.clock))
    }

    fn payment_env(&self) -> PaymentEnvironment {
        PaymentEnvironment::new(Arc::clone(&self.clock))
    }

    /// Runs a payment action; `Err` carries the rejection message.
    fn apply_payment(&self, payment: Payment, action: PaymentAction) -> Result<Payment, String> {
        let mut state = PaymentState::new(payment);
        PaymentReducer.reduce(&mut state, action, &self.payment_env());
        match state.last_error {
            Some(error) => Err(error.to_string()),
            None => Ok(state.payment),
        }
    }

    /// Persists a reconciled payment with its booking (if it changed), then runs effects.
    async fn commit(
        &self,
        payment: &Payment,
        booking: BookingState,
        mut effects: SmallVec<[Effect; 4]>,
        marker: ProcessedEvent,
    ) -> Result<ReconciliationOutcome, StoreError> {
        let changed = booking.last_error.is_none();
        if let Some(error) = &booking.last_error {
            tracing::warn!(
                confirmation_code = %booking.booking.confirmation_code,
                payment_intent = %payment.payment_intent_id,
                %error,
                "booking left unchanged by payment event"
            );
            effects.push(Effect::Notify(messages::payment_needs_attention(
                &booking.booking,
                &error.to_string(),
            )));
        }

        self.payments
            .save_reconciliation(payment, changed.then_some(&booking.booking), marker)
            .await?;
        if changed {
            metrics::counter!(BOOKING_TRANSITIONS_TOTAL, "to" => booking.booking.status.as_str())
                .increment(1);
        }
        self.effects.run(effects).await;

        Ok(ReconciliationOutcome::Updated {
            booking: booking.booking.id,
            payment: payment.id,
        })
    }

    async fn on_succeeded(
        &self,
        intent: PaymentIntent,
        marker: ProcessedEvent,
    ) -> Result<ReconciliationOutcome, StoreError> {
        if let Some((payment, booking)) = self.payments.find_by_intent(&intent.id).await? {
            if payment.status == PaymentStatus::Succeeded {
                self.payments.mark_event_processed(marker).await?;
                return Ok(ReconciliationOutcome::Duplicate);
            }
            let payment = match self.apply_payment(
                payment,
                PaymentAction::Succeed {
                    charge_id: intent.latest_charge.clone(),
                },
            ) {
                Ok(payment) => payment,
                Err(reason) => return self.ignore(marker, reason).await,
            };

            let item_title = self.item_title(booking.item).await?;
            let mut state = BookingState::new(booking);
            let effects = BookingReducer.reduce(
                &mut state,
                BookingAction::PaymentReceived { item_title },
                &self.booking_env(),
            );
            return self.commit(&payment, state, effects, marker).await;
        }

        let metadata = match CheckoutMetadata::from_map(&intent.metadata) {
            Ok(metadata) => metadata,
            Err(error) => {
                tracing::warn!(payment_intent = %intent.id, %error, "succeeded payment without usable metadata");
                return self.ignore(marker, error.to_string()).await;
            }
        };
        let item_title = self.item_title(metadata.item).await?;
        let now = self.clock.now();
        let payment = NewPayment {
            payment_intent_id: intent.id.clone(),
            charge_id: intent.latest_charge.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            status: PaymentStatus::Succeeded,
            failure_reason: None,
            paid_at: Some(now),
            created_at: now,
        };
        let (booking, payment) = self
            .create(metadata, &intent, BookingStatus::Confirmed, payment, marker)
            .await?;

        metrics::counter!(BOOKING_TRANSITIONS_TOTAL, "to" => booking.status.as_str()).increment(1);
        self.effects
            .run([Effect::notify_all(messages::payment_confirmed(
                &booking,
                &item_title,
            ))])
            .await;
        Ok(ReconciliationOutcome::Created {
            booking: booking.id,
            payment: payment.id,
        })
    }

    async fn on_failed(
        &self,
        intent: PaymentIntent,
        marker: ProcessedEvent,
    ) -> Result<ReconciliationOutcome, StoreError> {
        let reason = intent
            .failure_message
            .clone()
            .unwrap_or_else(|| "payment failed".to_string());

        if let Some((payment, booking)) = self.payments.find_by_intent(&intent.id).await? {
            let payment = match self.apply_payment(
                payment,
                PaymentAction::Fail {
                    reason: reason.clone(),
                },
            ) {
                Ok(payment) => payment,
                Err(rejection) => {
                    tracing::warn!(payment_intent = %intent.id, %rejection, "payment failure not applied");
                    return self.ignore(marker, rejection).await;
                }
            };

            let action = match self.policy {
                FailurePolicy::KeepPending => BookingAction::AnnotateAdmin {
                    note: format!("Payment failed: {reason}"),
                },
                FailurePolicy::Cancel => BookingAction::Cancel {
                    reason: Some(format!("payment failed: {reason}")),
                },
            };
            let mut state = BookingState::new(booking);
            let effects = BookingReducer.reduce(&mut state, action, &self.booking_env());
            return self.commit(&payment, state, effects, marker).await;
        }

        let metadata = match CheckoutMetadata::from_map(&intent.metadata) {
            Ok(metadata) => metadata,
            Err(error) => return self.ignore(marker, error.to_string()).await,
        };
        let status = match self.policy {
            FailurePolicy::KeepPending => BookingStatus::Pending,
            FailurePolicy::Cancel => BookingStatus::Cancelled,
        };
        let payment = NewPayment {
            payment_intent_id: intent.id.clone(),
            charge_id: intent.latest_charge.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            status: PaymentStatus::Failed,
            failure_reason: Some(reason),
            paid_at: None,
            created_at: self.clock.now(),
        };
        let (booking, payment) = self.create(metadata, &intent, status, payment, marker).await?;
        Ok(ReconciliationOutcome::Created {
            booking: booking.id,
            payment: payment.id,
        })
    }

    async fn on_refunded(
        &self,
        refund: ChargeRefund,
        marker: ProcessedEvent,
    ) -> Result<ReconciliationOutcome, StoreError> {
        let found = match &refund.payment_intent_id {
            Some(intent) => self.payments.find_by_intent(intent).await?,
            None => None,
        };
        let found = match found {
            Some(found) => Some(found),
            None => self.payments.find_by_charge(&refund.charge_id).await?,
        };
        let Some((payment, booking)) = found else {
            return self
                .ignore(marker, format!("no payment for charge {}", refund.charge_id))
                .await;
        };
        if payment.status == PaymentStatus::Refunded {
            self.payments.mark_event_processed(marker).await?;
            return Ok(ReconciliationOutcome::Duplicate);
        }
        let payment = match self.apply_payment(payment, PaymentAction::Refund) {
            Ok(payment) => payment,
            Err(rejection) => return self.ignore(marker, rejection).await,
        };

        let mut state = BookingState::new(booking);
        let effects = BookingReducer.reduce(
            &mut state,
            BookingAction::Cancel {
                reason: Some("payment refunded".to_string()),
            },
            &self.booking_env(),
        );
        self.commit(&payment, state, effects, marker).await
    }

    /// Creates booking and payment from session metadata in one transaction.
    async fn create(
        &self,
        metadata: CheckoutMetadata,
        intent: &PaymentIntent,
        status: BookingStatus,
        payment: NewPayment,
        marker: ProcessedEvent,
    ) -> Result<(Booking, Payment), StoreError> {
        let template = NewBooking {
            user_id: None,
            item: metadata.item,
            contact: Contact {
                name: metadata.customer_name,
                email: metadata.customer_email,
                phone: metadata.customer_phone,
            },
            booking_date: metadata.booking_date,
            participants: Participants::adults_only(metadata.participants),
            total_price: intent.amount,
            status,
            confirmation_code: self.codes.next_code(),
            special_requests: metadata.special_requests,
            admin_notes: format!("Online payment {}", intent.id),
            created_at: payment.created_at,
        };
        let payments = &self.payments;
        let (booking, payment) = with_fresh_code(
            self.codes.as_ref(),
            template.confirmation_code.clone(),
            |code| {
                let mut candidate = template.clone();
                candidate.confirmation_code = code;
                payments.create_with_payment(candidate, payment.clone(), marker.clone())
            },
        )
        .await?;
        tracing::info!(
            confirmation_code = %booking.confirmation_code,
            payment_intent = %payment.payment_intent_id,
            status = %booking.status,
            "booking created from payment event"
        );
        Ok((booking, payment))
    }
}
