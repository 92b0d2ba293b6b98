//! HTTP error responses.
//!
//! Every error body is `{code, message}`; validation failures add a `fields` map.

use ausflug_core::error::BookingError;
use ausflug_core::validation::FieldErrors;
use ausflug_core::webhook::WebhookError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Machine-readable error code, one per response status the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 422
    ValidationError,
    /// 502
    PaymentProviderError,
    /// 500
    InternalServerError,
}

impl ErrorCode {
    /// Response status for this code.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PaymentProviderError => StatusCode::BAD_GATEWAY,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by handlers.
///
/// ```ignore
/// async fn detail(State(state): State<AppState>) -> Result<Json<ItemDetail>, AppError> {
///     Ok(Json(state.catalog.detail(kind, &slug).await?))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    code: ErrorCode,
    message: String,
    fields: Option<FieldErrors>,
    /// Logged, never sent to the client
    source: Option<anyhow::Error>,
}

impl AppError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
            source: None,
        }
    }

    fn caused_by(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Machine-readable code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// 400
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// 401, staff token missing or wrong.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// 403, staff access switched off.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// 404
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// 422 listing every field problem.
    #[must_use]
    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            fields: Some(fields),
            ..Self::new(
                ErrorCode::ValidationError,
                "Please correct the highlighted fields.",
            )
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let cause = self.source.as_ref().map(|e| format!("{e:#}"));
            tracing::error!(
                %status,
                code = ?self.code,
                message = %self.message,
                cause = cause.as_deref(),
                "request failed"
            );
        }

        let body = ErrorBody {
            code: self.code,
            message: self.message,
            fields: self.fields,
        };
        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(fields) => Self::validation(fields),
            BookingError::NotFound(message) => Self::not_found(message),
            BookingError::ExternalProvider(message) => Self::new(
                ErrorCode::PaymentProviderError,
                "The payment provider could not be reached.",
            )
            .caused_by(anyhow::anyhow!(message)),
            BookingError::Integrity(message) => Self::new(ErrorCode::Conflict, message),
            BookingError::InvalidTransition(transition) => {
                Self::new(ErrorCode::Conflict, transition.to_string())
            }
            BookingError::Store(store) => {
                Self::new(ErrorCode::InternalServerError, "An internal error occurred")
                    .caused_by(store.into())
            }
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        tracing::warn!(error = %err, "webhook delivery rejected");
        Self::bad_request(err.to_string())
    }
}
