//! Axum HTTP surface for the AusflugÄgypten backend.
//!
//! Handlers are thin: they extract the request, call one service from
//! `ausflug-core` and map the result (or the [`AppError`]) to a response. All business
//! rules, transitions and effects live in the services.
//!
//! # Request Flow
//!
//! 1. **Correlation id** assigned by [`middleware::track_correlation_id`]
//! 2. **Extract** path, query, form/JSON body, origin or staff token
//! 3. **Call** the service
//! 4. **Map** the result or error to a status code and body
//!
//! # Example
//!
//! ```ignore
//! use ausflug_web::{AppState, router};
//!
//! let app = router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CorrelationId, FormOrJson, RequestOrigin, StaffAuth};
pub use middleware::{CORRELATION_ID_HEADER, track_correlation_id};
pub use state::{AppState, WebSettings};

/// The complete router with tracing and correlation ids.
pub fn router(state: AppState) -> Router {
    use handlers::{admin, bookings, catalog, reviews, webhook};

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/catalog/:kind", get(catalog::list))
        .route("/api/catalog/:kind/:slug", get(catalog::detail))
        .route("/bookings/inquiry/", post(bookings::submit_inquiry))
        .route(
            "/bookings/inquiry/success/:code/",
            get(bookings::inquiry_success),
        )
        .route(
            "/bookings/create-checkout-session/",
            post(bookings::create_checkout_session),
        )
        .route("/bookings/webhook/", post(webhook::receive))
        .route("/bookings/success/", get(bookings::checkout_success))
        .route("/bookings/cancel/", get(bookings::checkout_cancel))
        .route("/reviews/submit/", post(reviews::submit))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/bookings", get(admin::bookings))
        .route("/admin/bookings/:id/status", post(admin::change_status))
        .route("/admin/reviews/pending", get(admin::pending_reviews))
        .route("/admin/reviews/:id/approve", post(admin::approve_review))
        .route("/admin/reviews/:id", delete(admin::delete_review))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(track_correlation_id))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}
