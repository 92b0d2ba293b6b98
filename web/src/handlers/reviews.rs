//! Review submission.

use super::bookings::with_field_errors;
use crate::error::AppError;
use crate::extractors::FormOrJson;
use crate::state::AppState;
use ausflug_core::error::BookingError;
use ausflug_core::review::Review;
use ausflug_core::services::ReviewSubmission;
use ausflug_core::validation::{FieldErrors, ReviewForm};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

/// Stores a review for moderation.
///
/// ```text
/// POST /reviews/submit/
/// ```
///
/// Browser forms are sent back to the item page in every case: with `review=pending`
/// after a successful submission, with `error_<field>` parameters otherwise, and to `/`
/// when the item does not exist. JSON clients get 201, 422 or 404.
///
/// # Errors
///
/// Storage failures are answered with 500.
pub async fn submit(
    State(state): State<AppState>,
    FormOrJson { value: form, json }: FormOrJson<ReviewForm>,
) -> Result<Response, AppError> {
    match state.reviews.submit(&form).await {
        Ok(ReviewSubmission::Accepted { item, review }) => {
            if json {
                Ok((StatusCode::CREATED, Json::<Review>(review)).into_response())
            } else {
                Ok(Redirect::to(&format!("{}?review=pending", item.path())).into_response())
            }
        }
        Ok(ReviewSubmission::Rejected { item, errors }) => {
            if json {
                Err(AppError::validation(errors))
            } else {
                Ok(Redirect::to(&with_field_errors(&item.path(), &errors)).into_response())
            }
        }
        Err(BookingError::Validation(errors)) if !json => {
            Ok(Redirect::to(&with_field_errors("/", &errors)).into_response())
        }
        Err(BookingError::NotFound(message)) if !json => {
            tracing::info!(%message, "review for unknown item");
            let errors = FieldErrors::single("content", "The reviewed offer does not exist.");
            Ok(Redirect::to(&with_field_errors("/", &errors)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}
