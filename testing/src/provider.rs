//! Recording payment provider.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use ausflug_core::provider::{
    CheckoutSession, CheckoutSessionRequest, PaymentProvider, ProviderError,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Answers every request with `cs_test_N` and keeps the requests for assertions.
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    requests: Arc<Mutex<Vec<CheckoutSessionRequest>>>,
    failing: Arc<AtomicBool>,
}

impl MockPaymentProvider {
    /// Creates a provider that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail with an API error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PaymentProvider for MockPaymentProvider {
    fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CheckoutSession, ProviderError>> + Send + '_>> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ProviderError::Api {
                    status: 402,
                    message: "card_declined".to_string(),
                });
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            let id = format!("cs_test_{}", requests.len());
            Ok(CheckoutSession {
                url: Some(format!("https://checkout.stripe.test/pay/{id}")),
                id,
            })
        })
    }
}
