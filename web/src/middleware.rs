//! Correlation ids.
//!
//! Every request gets an id: the caller's `X-Correlation-ID` when it is usable,
//! otherwise a fresh UUID. Handlers read it as a [`CorrelationId`]; it is recorded on the
//! `http_request` span and echoed in the response header.

use crate::extractors::CorrelationId;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the id in both directions.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

const MAX_LEN: usize = 128;

/// Short printable ASCII without spaces.
fn usable(value: &str) -> bool {
    !value.is_empty() && value.len() <= MAX_LEN && value.bytes().all(|b| b.is_ascii_graphic())
}

fn correlation_id(req: &Request) -> String {
    req.headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| usable(v))
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}

/// Assigns the id, runs the rest of the stack inside its span and echoes it back.
///
/// ```ignore
/// let app = Router::new()
///     .route("/health", get(health))
///     .layer(axum::middleware::from_fn(track_correlation_id));
/// ```
pub async fn track_correlation_id(mut req: Request, next: Next) -> Response {
    let id = correlation_id(&req);
    let span = tracing::info_span!(
        "http_request",
        correlation_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(CorrelationId(id.clone()));

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/echo", get(|id: CorrelationId| async move { id.0 }))
            .layer(axum::middleware::from_fn(track_correlation_id))
    }

    /// Header value and body of one request.
    async fn roundtrip(header: Option<&str>) -> (String, String) {
        let mut request = http::Request::builder().uri("/echo");
        if let Some(value) = header {
            request = request.header(CORRELATION_ID_HEADER, value);
        }
        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let echoed = response.headers()[CORRELATION_ID_HEADER].to_str().unwrap().to_string();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn caller_id_reaches_handler_and_response() {
        let (echoed, seen) = roundtrip(Some("checkout-42")).await;
        assert_eq!(echoed, "checkout-42");
        assert_eq!(seen, "checkout-42");
    }

    #[tokio::test]
    async fn missing_id_is_generated() {
        let (echoed, seen) = roundtrip(None).await;
        assert!(Uuid::parse_str(&echoed).is_ok());
        assert_eq!(echoed, seen);
    }

    #[tokio::test]
    async fn unusable_ids_are_replaced() {
        let long = "x".repeat(MAX_LEN + 1);
        for bad in ["has spaces in it", long.as_str()] {
            let (echoed, _) = roundtrip(Some(bad)).await;
            assert!(Uuid::parse_str(&echoed).is_ok(), "{bad} was kept");
        }
    }
}
