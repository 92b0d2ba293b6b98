//! Conversions between column values and domain types.

use ausflug_core::catalog::{CatalogKind, CatalogRef};
use ausflug_core::error::StoreError;
use ausflug_core::money::Money;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row};

/// Maps a driver error onto the storage error taxonomy.
///
/// Unique violations keep the constraint name; decoding problems become
/// [`StoreError::Corrupt`]; everything else is a backend failure.
#[must_use]
pub fn store_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation {
            constraint: db.constraint().unwrap_or_default().to_string(),
        },
        sqlx::Error::RowNotFound => StoreError::NotFound(error.to_string()),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_) => StoreError::Corrupt(error.to_string()),
        _ => StoreError::Backend(error.to_string()),
    }
}

/// Reads one column.
pub(crate) fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column).map_err(store_error)
}

pub(crate) fn corrupt(column: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{column} has unexpected value {value}"))
}

pub(crate) fn to_cents(money: Money) -> Result<i64, StoreError> {
    i64::try_from(money.cents()).map_err(|_| corrupt("amount", money))
}

pub(crate) fn money(row: &PgRow, column: &str) -> Result<Money, StoreError> {
    let cents: i64 = get(row, column)?;
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| corrupt(column, cents))
}

pub(crate) fn optional_money(row: &PgRow, column: &str) -> Result<Option<Money>, StoreError> {
    let cents: Option<i64> = get(row, column)?;
    cents
        .map(|c| u64::try_from(c).map(Money::from_cents).map_err(|_| corrupt(column, c)))
        .transpose()
}

pub(crate) fn count(row: &PgRow, column: &str) -> Result<u64, StoreError> {
    let n: i64 = get(row, column)?;
    u64::try_from(n).map_err(|_| corrupt(column, n))
}

pub(crate) fn unsigned(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let n: i32 = get(row, column)?;
    u32::try_from(n).map_err(|_| corrupt(column, n))
}

pub(crate) fn to_i32(n: u32) -> Result<i32, StoreError> {
    i32::try_from(n).map_err(|_| corrupt("count", n))
}

pub(crate) fn kind(row: &PgRow, column: &str) -> Result<CatalogKind, StoreError> {
    let raw: String = get(row, column)?;
    CatalogKind::parse(&raw).ok_or_else(|| corrupt(column, raw))
}

/// Reads an `(item_kind, item_id)` pair.
pub(crate) fn item_ref(row: &PgRow) -> Result<CatalogRef, StoreError> {
    Ok(CatalogRef::new(kind(row, "item_kind")?, get(row, "item_id")?))
}
