//! Staff endpoints. Every handler requires [`StaffAuth`].

use crate::error::AppError;
use crate::extractors::StaffAuth;
use crate::state::AppState;
use ausflug_core::booking::{Booking, BookingId, BookingStatus};
use ausflug_core::review::{Review, ReviewId};
use ausflug_core::services::Dashboard;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 200;

fn list_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Dashboard counts.
///
/// ```text
/// GET /admin/dashboard
/// ```
///
/// # Errors
///
/// 500 on storage failure.
pub async fn dashboard(
    _auth: StaffAuth,
    State(state): State<AppState>,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(state.dashboard.snapshot().await?))
}

/// Query of the booking list.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookingListParams {
    /// `pending`, `confirmed`, `cancelled` or `completed`
    pub status: Option<String>,
    /// At most this many rows
    pub limit: Option<u32>,
}

/// Newest bookings, optionally filtered by status.
///
/// ```text
/// GET /admin/bookings?status=pending&limit=20
/// ```
///
/// # Errors
///
/// 400 for an unknown status, 500 on storage failure.
pub async fn bookings(
    _auth: StaffAuth,
    State(state): State<AppState>,
    Query(params): Query<BookingListParams>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| AppError::bad_request(format!("unknown status {raw}")))?,
        ),
    };
    Ok(Json(
        state.staff.recent(status, list_limit(params.limit)).await?,
    ))
}

/// Requested status change.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    /// Target status
    pub status: BookingStatus,
    /// Optional note for the admin notes
    #[serde(default)]
    pub note: Option<String>,
}

/// Applies a staff status change through the booking lifecycle.
///
/// ```text
/// POST /admin/bookings/{id}/status   {"status": "confirmed", "note": "Guide: Ahmed"}
/// ```
///
/// # Errors
///
/// 404 for unknown bookings, 409 for transitions the lifecycle forbids.
pub async fn change_status(
    _auth: StaffAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .staff
        .transition(BookingId::new(id), change.status, change.note)
        .await?;
    Ok(Json(booking))
}

/// Query of the moderation queue.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PendingParams {
    /// At most this many reviews
    pub limit: Option<u32>,
}

/// Oldest unapproved reviews first.
///
/// ```text
/// GET /admin/reviews/pending
/// ```
///
/// # Errors
///
/// 500 on storage failure.
pub async fn pending_reviews(
    _auth: StaffAuth,
    State(state): State<AppState>,
    Query(params): Query<PendingParams>,
) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(state.reviews.pending(list_limit(params.limit)).await?))
}

/// Approves a review.
///
/// ```text
/// POST /admin/reviews/{id}/approve
/// ```
///
/// # Errors
///
/// 404 for unknown reviews.
pub async fn approve_review(
    _auth: StaffAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Review>, AppError> {
    Ok(Json(state.reviews.approve(ReviewId::new(id)).await?))
}

/// Deletes a review.
///
/// ```text
/// DELETE /admin/reviews/{id}
/// ```
///
/// # Errors
///
/// 404 for unknown reviews.
pub async fn delete_review(
    _auth: StaffAuth,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.reviews.delete(ReviewId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_limit_is_bounded() {
        assert_eq!(list_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(list_limit(Some(0)), 1);
        assert_eq!(list_limit(Some(10_000)), MAX_LIST_LIMIT);
    }
}
