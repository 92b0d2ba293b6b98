//! Application state for Axum handlers.

use ausflug_core::repository::ReadinessProbe;
use ausflug_core::services::{
    BookingAdminService, CatalogService, CheckoutService, DashboardService, InquiryService,
    ReconciliationService, ReviewService,
};
use ausflug_core::webhook::WebhookVerifier;
use std::sync::Arc;

/// Request-independent settings of the HTTP layer.
#[derive(Clone, Debug, Default)]
pub struct WebSettings {
    /// Origin used for checkout redirects instead of the request's own
    pub public_base_url: Option<String>,
    /// Bearer token for the staff endpoints; `None` disables them
    pub admin_token: Option<String>,
}

/// Application state shared across all HTTP handlers.
///
/// Every service holds its ports behind `Arc`s, so cloning the state per request is
/// cheap.
#[derive(Clone)]
pub struct AppState {
    /// Listing and detail pages
    pub catalog: CatalogService,
    /// Booking inquiries and confirmation lookup
    pub inquiries: InquiryService,
    /// Hosted checkout sessions
    pub checkout: CheckoutService,
    /// Payment webhook reconciliation
    pub reconciliation: ReconciliationService,
    /// Review submission and moderation
    pub reviews: ReviewService,
    /// Staff booking actions
    pub staff: BookingAdminService,
    /// Staff dashboard counts
    pub dashboard: DashboardService,
    /// Webhook authentication
    pub verifier: WebhookVerifier,
    /// Backend health for `/ready`
    pub readiness: Arc<dyn ReadinessProbe>,
    /// Origin and staff token settings
    pub settings: WebSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Axum clones the state into every handler
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn staff_endpoints_are_disabled_by_default() {
        assert!(WebSettings::default().admin_token.is_none());
    }
}
