//! Payment provider webhook.

use crate::error::AppError;
use crate::state::AppState;
use ausflug_core::metrics::WEBHOOK_EVENTS_TOTAL;
use ausflug_core::services::ReconciliationOutcome;
use ausflug_core::webhook::SIGNATURE_HEADER;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

/// Acknowledgement sent back to the provider.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    /// `created`, `updated`, `duplicate` or `ignored`
    pub outcome: String,
}

/// Verifies, parses and reconciles one delivery.
///
/// ```text
/// POST /bookings/webhook/
/// ```
///
/// The raw body is verified before anything is parsed.
///
/// # Errors
///
/// - 400 for a missing, stale or wrong signature and for unreadable payloads
/// - 409 when a concurrent delivery created the same payment intent
/// - 500 on storage failure, so the provider retries
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let event = state.verifier.verify(signature, &body).map_err(|err| {
        metrics::counter!(WEBHOOK_EVENTS_TOTAL, "outcome" => "rejected").increment(1);
        AppError::from(err)
    })?;

    tracing::debug!(event_id = %event.id, event_type = %event.event_type, "webhook event verified");
    let outcome: ReconciliationOutcome = state.reconciliation.reconcile(event).await?;
    Ok(Json(WebhookAck {
        outcome: outcome.as_str().to_string(),
    }))
}
