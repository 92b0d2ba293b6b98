//! Booking inquiry, confirmation lookup and checkout endpoints.

use crate::error::AppError;
use crate::extractors::{FormOrJson, RequestOrigin};
use crate::state::AppState;
use ausflug_core::booking::{BookingStatus, ConfirmationView};
use ausflug_core::confirmation::ConfirmationCode;
use ausflug_core::error::BookingError;
use ausflug_core::money::Money;
use ausflug_core::validation::{CheckoutForm, FieldErrors, InquiryForm};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

/// Confirmation page path of a stored inquiry.
#[must_use]
pub fn inquiry_success_path(code: &ConfirmationCode) -> String {
    format!("/bookings/inquiry/success/{code}/")
}

/// Same-site path the browser came from, `/` when unknown.
pub(crate) fn back_path(headers: &HeaderMap) -> String {
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/");
    // Keep only the path so a forged referer cannot redirect off-site.
    let path = match referer.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None if referer.starts_with('/') => referer,
        None => "/",
    };
    let path = path.split(['?', '#']).next().unwrap_or("/");
    // Browsers read `//host` and `/\\host` as another origin.
    if path.is_empty() || matches!(path.as_bytes().get(1), Some(b'/' | b'\\')) {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// `path?error_<field>=<first message>&...`
pub(crate) fn with_field_errors(path: &str, errors: &FieldErrors) -> String {
    let pairs: Vec<(String, &str)> = errors
        .iter()
        .filter_map(|(field, messages)| {
            messages
                .first()
                .map(|m| (format!("error_{field}"), m.as_str()))
        })
        .collect();
    match serde_urlencoded::to_string(&pairs) {
        Ok(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}

/// JSON answer to an accepted inquiry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InquiryCreated {
    /// Code for the confirmation page
    pub confirmation_code: ConfirmationCode,
    /// Always pending
    pub status: BookingStatus,
    /// Price quoted to the customer
    pub total_price: Money,
    /// Confirmation page path
    pub success_url: String,
}

/// Booking inquiry.
///
/// ```text
/// POST /bookings/inquiry/
/// ```
///
/// Browser forms get a 303 to the confirmation page, or back to the referring page with
/// `error_<field>` query parameters. JSON clients get 201, 422 or 404.
///
/// # Errors
///
/// Storage failures are answered with 500 for both kinds of client.
pub async fn submit_inquiry(
    State(state): State<AppState>,
    headers: HeaderMap,
    FormOrJson { value: form, json }: FormOrJson<InquiryForm>,
) -> Result<Response, AppError> {
    match state.inquiries.submit(&form).await {
        Ok(booking) => {
            let success_url = inquiry_success_path(&booking.confirmation_code);
            if json {
                let body = InquiryCreated {
                    confirmation_code: booking.confirmation_code,
                    status: booking.status,
                    total_price: booking.total_price,
                    success_url,
                };
                Ok((StatusCode::CREATED, Json(body)).into_response())
            } else {
                Ok(Redirect::to(&success_url).into_response())
            }
        }
        Err(BookingError::Validation(errors)) if !json => {
            Ok(Redirect::to(&with_field_errors(&back_path(&headers), &errors)).into_response())
        }
        Err(BookingError::NotFound(message)) if !json => {
            let errors = FieldErrors::single("item", "The selected offer is not available.");
            tracing::info!(%message, "inquiry for unavailable item");
            Ok(Redirect::to(&with_field_errors(&back_path(&headers), &errors)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// Confirmation page data. Exposes no contact details.
///
/// ```text
/// GET /bookings/inquiry/success/{code}/
/// ```
///
/// # Errors
///
/// 404 for unknown or malformed codes.
pub async fn inquiry_success(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ConfirmationView>, AppError> {
    Ok(Json(state.inquiries.lookup(&code).await?))
}

/// Successful checkout session.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCreated {
    /// Provider session id for the client-side redirect
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Failed checkout session.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionFailed {
    /// Reason shown to the customer
    pub error: String,
    /// Field messages for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// Hosted checkout session. Writes nothing; the booking is created by the webhook.
///
/// ```text
/// POST /bookings/create-checkout-session/
/// ```
///
/// Answers `{sessionId}`, or 400 `{error}` when the request or the provider fails.
///
/// # Errors
///
/// Storage failures are answered with 500.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    RequestOrigin(origin): RequestOrigin,
    Json(form): Json<CheckoutForm>,
) -> Result<Response, AppError> {
    let failed = |error: String, fields: Option<FieldErrors>| {
        (StatusCode::BAD_REQUEST, Json(SessionFailed { error, fields })).into_response()
    };

    match state.checkout.create_session(&form, &origin).await {
        Ok(session) => Ok(Json(SessionCreated {
            session_id: session.id,
        })
        .into_response()),
        Err(BookingError::Validation(errors)) => Ok(failed(
            "Please correct the highlighted fields.".to_string(),
            Some(errors),
        )),
        Err(BookingError::NotFound(message)) => Ok(failed(message, None)),
        Err(BookingError::ExternalProvider(message)) => {
            tracing::warn!(%message, "checkout session could not be created");
            Ok(failed(
                "The payment could not be started. Please try again.".to_string(),
                None,
            ))
        }
        Err(err) => Err(err.into()),
    }
}

/// Query of the provider's success redirect.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SuccessParams {
    /// Provider session id
    pub session_id: Option<String>,
}

/// Landing acknowledgement.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Landing {
    /// `payment_received` or `payment_cancelled`
    pub status: String,
    /// Echoed session id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Text for the customer
    pub message: String,
}

/// Where the provider sends the customer after paying. The booking itself arrives via
/// the webhook.
///
/// ```text
/// GET /bookings/success/?session_id=...
/// ```
#[allow(clippy::unused_async)]
pub async fn checkout_success(Query(params): Query<SuccessParams>) -> Json<Landing> {
    Json(Landing {
        status: "payment_received".to_string(),
        session_id: params.session_id,
        message: "Thank you! Your booking confirmation is on its way by e-mail.".to_string(),
    })
}

/// Where the provider sends the customer after aborting the payment.
///
/// ```text
/// GET /bookings/cancel/
/// ```
#[allow(clippy::unused_async)]
pub async fn checkout_cancel() -> Json<Landing> {
    Json(Landing {
        status: "payment_cancelled".to_string(),
        session_id: None,
        message: "The payment was cancelled. No booking has been made.".to_string(),
    })
}
