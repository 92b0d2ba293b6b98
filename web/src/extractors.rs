//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the id assigned by the correlation middleware
//! - [`RequestOrigin`]: scheme and host used to build checkout redirect URLs
//! - [`StaffAuth`]: bearer-token guard for the staff endpoints
//! - [`FormOrJson`]: storefront forms that are posted either url-encoded or as JSON

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use crate::state::AppState;
use axum::{
    Form, Json, async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Read from the request extensions populated by
/// [`track_correlation_id`](crate::middleware::track_correlation_id). Without that
/// middleware, falls back to the `X-Correlation-ID` header or a new UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(id.clone());
        }
        let id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        Ok(Self(id))
    }
}

/// Origin such as `https://ausflugagypten.com`, without a trailing slash.
///
/// The configured public base URL wins. Otherwise the origin is rebuilt from
/// `X-Forwarded-Proto`/`X-Forwarded-Host` (set by the reverse proxy) or `Host`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

fn first_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn origin_from_headers(headers: &HeaderMap) -> Option<String> {
    let host = first_value(headers, "x-forwarded-host")
        .or_else(|| first_value(headers, header::HOST.as_str()))?;
    let scheme = first_value(headers, "x-forwarded-proto").unwrap_or("http");
    Some(format!("{scheme}://{host}"))
}

#[async_trait]
impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(base) = &state.settings.public_base_url {
            return Ok(Self(base.trim_end_matches('/').to_string()));
        }
        origin_from_headers(&parts.headers)
            .map(Self)
            .ok_or_else(|| AppError::bad_request("Cannot determine the request origin."))
    }
}

/// Proof that the request carried the staff bearer token.
///
/// Rejects with 403 when no token is configured and 401 when the header is missing or
/// wrong. The comparison runs in constant time.
#[derive(Debug, Clone, Copy)]
pub struct StaffAuth;

#[async_trait]
impl FromRequestParts<AppState> for StaffAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.settings.admin_token.as_deref() else {
            return Err(AppError::forbidden("Staff endpoints are disabled."));
        };
        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match presented {
            Some(token) if constant_time_eq::constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
                Ok(Self)
            }
            _ => {
                tracing::warn!(path = %parts.uri.path(), "staff request with missing or wrong token");
                Err(AppError::unauthorized("A valid staff token is required."))
            }
        }
    }
}

/// A form body, url-encoded or JSON depending on `Content-Type`.
///
/// `json` tells the handler which kind of client it is answering: browsers get
/// redirects, JSON clients get status codes.
#[derive(Debug, Clone)]
pub struct FormOrJson<T> {
    /// Decoded body
    pub value: T,
    /// Whether the body was JSON
    pub json: bool,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"))
}

#[async_trait]
impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            Ok(Self { value, json: true })
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::bad_request(e.body_text()))?;
            Ok(Self { value, json: false })
        }
    }
}
