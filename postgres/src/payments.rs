//! Payment queries and the webhook deduplication log.

use crate::PostgresStore;
use crate::bookings::{BOOKING_COLUMNS, booking_from_row, insert_booking, update_booking};
use crate::convert::{corrupt, get, money, store_error, to_cents};
use async_trait::async_trait;
use ausflug_core::booking::{Booking, BookingId, NewBooking};
use ausflug_core::error::StoreError;
use ausflug_core::payment::{NewPayment, Payment, PaymentId, PaymentStatus};
use ausflug_core::repository::{PaymentRepository, ProcessedEvent};
use sqlx::PgExecutor;
use sqlx::postgres::PgRow;

const PAYMENT_COLUMNS: &str = r"
    id, booking_id, payment_intent_id, charge_id, amount_cents, currency, status,
    failure_reason, paid_at, created_at, updated_at, version
";

fn payment_from_row(row: &PgRow) -> Result<Payment, StoreError> {
    let status: String = get(row, "status")?;
    Ok(Payment {
        id: PaymentId::new(get(row, "id")?),
        booking_id: BookingId::new(get(row, "booking_id")?),
        payment_intent_id: get(row, "payment_intent_id")?,
        charge_id: get(row, "charge_id")?,
        amount: money(row, "amount_cents")?,
        currency: get(row, "currency")?,
        status: PaymentStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        failure_reason: get(row, "failure_reason")?,
        paid_at: get(row, "paid_at")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        version: get(row, "version")?,
    })
}

async fn insert_event<'e, E>(executor: E, event: &ProcessedEvent) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(&event.event_id)
    .bind(&event.event_type)
    .bind(event.processed_at)
    .execute(executor)
    .await
    .map_err(store_error)?;
    Ok(())
}

impl PostgresStore {
    /// Loads a payment matched on `column` together with its booking.
    async fn payment_with_booking(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<(Payment, Booking)>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(self.pool())
        .await
        .map_err(store_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let payment = payment_from_row(&row)?;

        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(payment.booking_id.as_i64())
            .fetch_optional(self.pool())
            .await
            .map_err(store_error)?
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "payment {} references missing booking {}",
                    payment.id, payment.booking_id
                ))
            })?;
        Ok(Some((payment, booking_from_row(&row)?)))
    }
}

#[async_trait]
impl PaymentRepository for PostgresStore {
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM processed_webhook_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(self.pool())
        .await
        .map_err(store_error)
    }

    async fn find_by_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<(Payment, Booking)>, StoreError> {
        self.payment_with_booking("payment_intent_id", payment_intent_id)
            .await
    }

    async fn find_by_charge(
        &self,
        charge_id: &str,
    ) -> Result<Option<(Payment, Booking)>, StoreError> {
        self.payment_with_booking("charge_id", charge_id).await
    }

    async fn create_with_payment(
        &self,
        booking: NewBooking,
        payment: NewPayment,
        event: ProcessedEvent,
    ) -> Result<(Booking, Payment), StoreError> {
        let mut tx = self.pool().begin().await.map_err(store_error)?;

        let booking = insert_booking(&mut *tx, booking).await?;

        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO payments (
                booking_id, payment_intent_id, charge_id, amount_cents, currency, status,
                failure_reason, paid_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id
            ",
        )
        .bind(booking.id.as_i64())
        .bind(&payment.payment_intent_id)
        .bind(&payment.charge_id)
        .bind(to_cents(payment.amount)?)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.failure_reason)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        insert_event(&mut *tx, &event).await?;
        tx.commit().await.map_err(store_error)?;

        let payment = payment.into_payment(PaymentId::new(id), booking.id);
        tracing::debug!(
            booking_id = %booking.id,
            payment_id = %payment.id,
            event_id = %event.event_id,
            "booking and payment stored"
        );
        Ok((booking, payment))
    }

    async fn save_reconciliation(
        &self,
        payment: &Payment,
        booking: Option<&Booking>,
        event: ProcessedEvent,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await.map_err(store_error)?;

        // The marker goes first so a concurrent delivery of the same event fails on the
        // primary key before it touches the payment.
        insert_event(&mut *tx, &event).await?;

        let result = sqlx::query(
            r"
            UPDATE payments
            SET charge_id = $2, status = $3, failure_reason = $4, paid_at = $5,
                updated_at = $6, version = version + 1
            WHERE id = $1 AND version = $7
            ",
        )
        .bind(payment.id.as_i64())
        .bind(&payment.charge_id)
        .bind(payment.status.as_str())
        .bind(&payment.failure_reason)
        .bind(payment.paid_at)
        .bind(payment.updated_at)
        .bind(payment.version)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::conflict(format!("payment {}", payment.id), payment.version));
        }

        if let Some(booking) = booking {
            update_booking(&mut *tx, booking).await?;
        }

        tx.commit().await.map_err(store_error)
    }

    async fn mark_event_processed(&self, event: ProcessedEvent) -> Result<(), StoreError> {
        insert_event(self.pool(), &event).await
    }
}
