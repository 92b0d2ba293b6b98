//! Stripe checkout client.
//!
//! Only the one call the checkout flow needs: `POST /v1/checkout/sessions`, form-encoded
//! with Stripe's bracketed keys and authenticated with the secret key as bearer token.

use ausflug_core::provider::{
    CheckoutSession, CheckoutSessionRequest, PaymentProvider, ProviderError,
};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl StripeClient {
    /// Creates a client for `api_base` (normally `https://api.stripe.com`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        currency: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            currency: currency.into(),
        })
    }

    async fn create_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let form = session_form(&request, &self.currency);
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&body);
            tracing::warn!(status = status.as_u16(), %message, "stripe rejected checkout session");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        tracing::debug!(session_id = %session.id, "stripe checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}

impl PaymentProvider for StripeClient {
    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CheckoutSession, ProviderError>> + Send + '_>> {
        Box::pin(self.create_session(request))
    }
}

/// Form fields of a checkout session. Metadata goes on the session and on the payment
/// intent, so both webhook event families carry it.
fn session_form(request: &CheckoutSessionRequest, currency: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("customer_email".to_string(), request.customer_email.clone()),
    ];

    for (i, line) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            currency.to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            line.unit_amount.cents().to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
    }

    for (key, value) in request.metadata.to_pairs() {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value));
    }
    form
}

/// Stripe's error message, or the raw body when it is not an error envelope.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => error
            .message
            .or(error.kind)
            .unwrap_or_else(|| "unknown error".to_string()),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ausflug_core::catalog::CatalogRef;
    use ausflug_core::money::Money;
    use ausflug_core::provider::{CheckoutMetadata, LineItem};
    use axum::{Form, Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn request() -> CheckoutSessionRequest {
        let metadata = CheckoutMetadata {
            item: CatalogRef::Tour(7),
            participants: 2,
            booking_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            customer_name: "Sara Klein".to_string(),
            customer_email: "sara@example.com".to_string(),
            customer_phone: "+49 30 1234".to_string(),
            special_requests: String::new(),
        };
        CheckoutSessionRequest {
            line_items: vec![LineItem {
                name: "Valley of the Kings".to_string(),
                unit_amount: Money::from_cents(10_000),
                quantity: 2,
            }],
            success_url: "https://ausflugagypten.com/bookings/success/?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://ausflugagypten.com/bookings/cancel/".to_string(),
            customer_email: "sara@example.com".to_string(),
            metadata,
        }
    }

    #[test]
    fn form_uses_bracketed_keys() {
        let form: HashMap<String, String> = session_form(&request(), "eur").into_iter().collect();
        assert_eq!(form["mode"], "payment");
        assert_eq!(form["line_items[0][price_data][currency]"], "eur");
        assert_eq!(form["line_items[0][price_data][unit_amount]"], "10000");
        assert_eq!(form["line_items[0][quantity]"], "2");
        assert_eq!(form["metadata[item_kind]"], "tour");
        assert_eq!(form["payment_intent_data[metadata][item_id]"], "7");
        assert_eq!(form["payment_intent_data[metadata][booking_date]"], "2025-03-14");
    }

    #[test]
    fn error_messages_are_extracted() {
        assert_eq!(
            error_message(r#"{"error":{"message":"No such price","type":"invalid_request_error"}}"#),
            "No such price"
        );
        assert_eq!(
            error_message(r#"{"error":{"type":"api_error"}}"#),
            "api_error"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    type Captured = Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>;

    async fn fake_stripe(status: StatusCode, body: serde_json::Value) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let sink = Arc::clone(&captured);
        let app = Router::new().route(
            "/v1/checkout/sessions",
            post(move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                let sink = Arc::clone(&sink);
                let body = body.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    sink.lock().unwrap().push((auth, form));
                    (status, Json(body))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    #[tokio::test]
    async fn creates_session_with_bearer_key() {
        let (base, captured) = fake_stripe(
            StatusCode::OK,
            serde_json::json!({ "id": "cs_test_a1", "url": "https://checkout.stripe.com/c/pay/cs_test_a1" }),
        )
        .await;
        let client = StripeClient::new("sk_test_123", base, "eur").unwrap();

        let session = client.create_checkout_session(request()).await.unwrap();
        assert_eq!(session.id, "cs_test_a1");
        assert!(session.url.is_some());

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("Bearer sk_test_123"));
        assert_eq!(calls[0].1["customer_email"], "sara@example.com");
        assert_eq!(calls[0].1["metadata[participants]"], "2");
    }

    #[tokio::test]
    async fn api_errors_are_reported() {
        let (base, _) = fake_stripe(
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": { "message": "Invalid currency", "type": "invalid_request_error" } }),
        )
        .await;
        let client = StripeClient::new("sk_test_123", base, "xxx").unwrap();

        let err = client.create_checkout_session(request()).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Api {
                status: 400,
                message: "Invalid currency".to_string(),
            }
        );
    }
}
