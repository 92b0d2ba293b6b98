//! Use-case services.
//!
//! Each service is a small struct of injected ports, cheap to clone and shared through
//! the web state.

pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod inquiry;
pub mod reconciliation;
pub mod reviews;
pub mod staff;

pub use catalog::{CatalogService, ItemDetail};
pub use checkout::CheckoutService;
pub use dashboard::{Dashboard, DashboardService};
pub use inquiry::InquiryService;
pub use reconciliation::{FailurePolicy, ReconciliationOutcome, ReconciliationService};
pub use reviews::{ReviewService, ReviewSubmission};
pub use staff::BookingAdminService;

use crate::catalog::{CatalogItem, CatalogRef};
use crate::confirmation::ConfirmationCode;
use crate::environment::CodeGenerator;
use crate::error::{BookingError, StoreError};
use crate::repository::{CONFIRMATION_CODE_CONSTRAINT, CatalogRepository};
use std::fmt::Display;
use std::future::Future;

/// Attempts made to find an unused confirmation code.
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Runs `insert` with `first`, then with fresh codes, until it does not collide on the
/// confirmation-code constraint. Other errors, and the last collision, are returned
/// unchanged.
pub(crate) async fn with_fresh_code<T, F, Fut>(
    codes: &dyn CodeGenerator,
    first: ConfirmationCode,
    mut insert: F,
) -> Result<T, StoreError>
where
    F: FnMut(ConfirmationCode) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    let mut code = first;
    loop {
        match insert(code.clone()).await {
            Err(err) if err.violates(CONFIRMATION_CODE_CONSTRAINT) && attempt < MAX_CODE_ATTEMPTS => {
                tracing::warn!(confirmation_code = %code, attempt, "confirmation code collision, regenerating");
                attempt += 1;
                code = codes.next_code();
            }
            other => return other,
        }
    }
}

/// Attempts made when a versioned write loses to a concurrent writer.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Runs `write` (which must re-read what it changes) until it no longer fails with a
/// conflict according to `conflicted`. The last conflict is returned unchanged.
pub(crate) async fn retry_on_conflict<T, E, F, Fut>(
    conflicted: impl Fn(&E) -> bool,
    mut write: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match write().await {
            Err(err) if conflicted(&err) && attempt < MAX_WRITE_ATTEMPTS => {
                tracing::info!(error = %err, attempt, "concurrent write detected, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Loads an item that customers may book or review.
pub(crate) async fn resolve_active(
    catalog: &dyn CatalogRepository,
    item: CatalogRef,
) -> Result<CatalogItem, BookingError> {
    catalog
        .find(item)
        .await?
        .filter(|found| found.is_active)
        .ok_or_else(|| BookingError::NotFound(format!("{item} does not exist")))
}
