//! Booking queries.

use crate::PostgresStore;
use crate::convert::{corrupt, count, get, item_ref, money, store_error, to_cents, to_i32, unsigned};
use async_trait::async_trait;
use ausflug_core::booking::{Booking, BookingId, BookingStatus, Contact, NewBooking, Participants};
use ausflug_core::confirmation::ConfirmationCode;
use ausflug_core::environment::StatsWindow;
use ausflug_core::error::StoreError;
use ausflug_core::repository::{BookingRepository, BookingStats};
use sqlx::PgExecutor;
use sqlx::postgres::PgRow;

pub(crate) const BOOKING_COLUMNS: &str = r"
    id, user_id, item_kind, item_id, contact_name, contact_email, contact_phone,
    booking_date, adults, children, babies, number_of_participants, total_price_cents,
    status, confirmation_code, special_requests, admin_notes, created_at, updated_at, version
";

pub(crate) fn booking_from_row(row: &PgRow) -> Result<Booking, StoreError> {
    let status: String = get(row, "status")?;
    let code: String = get(row, "confirmation_code")?;
    Ok(Booking {
        id: BookingId::new(get(row, "id")?),
        user_id: get(row, "user_id")?,
        item: item_ref(row)?,
        contact: Contact {
            name: get(row, "contact_name")?,
            email: get(row, "contact_email")?,
            phone: get(row, "contact_phone")?,
        },
        booking_date: get(row, "booking_date")?,
        participants: Participants {
            adults: unsigned(row, "adults")?,
            children: unsigned(row, "children")?,
            babies: unsigned(row, "babies")?,
        },
        number_of_participants: unsigned(row, "number_of_participants")?,
        total_price: money(row, "total_price_cents")?,
        status: BookingStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        confirmation_code: ConfirmationCode::parse(&code)
            .map_err(|_| corrupt("confirmation_code", &code))?,
        special_requests: get(row, "special_requests")?,
        admin_notes: get(row, "admin_notes")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
        version: get(row, "version")?,
    })
}

/// Inserts a booking on any executor, so the same statement serves plain inserts and
/// the reconciliation transaction.
pub(crate) async fn insert_booking<'e, E>(
    executor: E,
    booking: NewBooking,
) -> Result<Booking, StoreError>
where
    E: PgExecutor<'e>,
{
    let id: i64 = sqlx::query_scalar(
        r"
        INSERT INTO bookings (
            user_id, item_kind, item_id, contact_name, contact_email, contact_phone,
            booking_date, adults, children, babies, number_of_participants,
            total_price_cents, status, confirmation_code, special_requests, admin_notes,
            created_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17
        )
        RETURNING id
        ",
    )
    .bind(booking.user_id)
    .bind(booking.item.kind().as_str())
    .bind(booking.item.id())
    .bind(&booking.contact.name)
    .bind(&booking.contact.email)
    .bind(&booking.contact.phone)
    .bind(booking.booking_date)
    .bind(to_i32(booking.participants.adults)?)
    .bind(to_i32(booking.participants.children)?)
    .bind(to_i32(booking.participants.babies)?)
    .bind(to_i32(booking.number_of_participants())?)
    .bind(to_cents(booking.total_price)?)
    .bind(booking.status.as_str())
    .bind(booking.confirmation_code.as_str())
    .bind(&booking.special_requests)
    .bind(&booking.admin_notes)
    .bind(booking.created_at)
    .fetch_one(executor)
    .await
    .map_err(store_error)?;

    Ok(booking.into_booking(BookingId::new(id)))
}

/// Writes the mutable booking columns if the row is still at `booking.version`.
pub(crate) async fn update_booking<'e, E>(executor: E, booking: &Booking) -> Result<(), StoreError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r"
        UPDATE bookings
        SET status = $2, admin_notes = $3, updated_at = $4, version = version + 1
        WHERE id = $1 AND version = $5
        ",
    )
    .bind(booking.id.as_i64())
    .bind(booking.status.as_str())
    .bind(&booking.admin_notes)
    .bind(booking.updated_at)
    .bind(booking.version)
    .execute(executor)
    .await
    .map_err(store_error)?;

    // The row was read before, so a miss means someone else updated (or deleted) it.
    if result.rows_affected() == 0 {
        return Err(StoreError::conflict(format!("booking {}", booking.id), booking.version));
    }
    Ok(())
}

#[async_trait]
impl BookingRepository for PostgresStore {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        insert_booking(self.pool(), booking).await
    }

    async fn find(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool())
            .await
            .map_err(store_error)?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn find_by_code(&self, code: &ConfirmationCode) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE confirmation_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(store_error)?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn update(&self, booking: &Booking) -> Result<(), StoreError> {
        update_booking(self.pool(), booking).await
    }

    async fn recent(
        &self,
        status: Option<BookingStatus>,
        limit: u32,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE $1::TEXT IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(store_error)?;
        rows.iter().map(booking_from_row).collect()
    }

    async fn stats(&self, window: StatsWindow) -> Result<BookingStats, StoreError> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
                COUNT(*) FILTER (WHERE created_at >= $1) AS today,
                COUNT(*) FILTER (WHERE created_at >= $2) AS last_7_days,
                COUNT(*) FILTER (WHERE created_at >= $3) AS last_30_days,
                COUNT(*) FILTER (WHERE status = 'pending' AND created_at >= $2) AS new_pending,
                COALESCE(SUM(total_price_cents) FILTER (
                    WHERE status IN ('confirmed', 'completed')
                ), 0)::BIGINT AS revenue_cents
            FROM bookings
            ",
        )
        .bind(window.today_start)
        .bind(window.week_start)
        .bind(window.month_start)
        .fetch_one(self.pool())
        .await
        .map_err(store_error)?;

        Ok(BookingStats {
            total: count(&row, "total")?,
            pending: count(&row, "pending")?,
            confirmed: count(&row, "confirmed")?,
            today: count(&row, "today")?,
            last_7_days: count(&row, "last_7_days")?,
            last_30_days: count(&row, "last_30_days")?,
            new_pending: count(&row, "new_pending")?,
            revenue: money(&row, "revenue_cents")?,
        })
    }
}
