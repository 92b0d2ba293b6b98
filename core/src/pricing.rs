//! Total price computation.

use crate::catalog::{CatalogItem, PricingMode};
use crate::money::Money;
use thiserror::Error;

/// Pricing failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Unit price times participants does not fit the money type
    #[error("total price overflows for {participants} participants")]
    Overflow {
        /// Requested head count
        participants: u32,
    },
}

/// Total price of booking `item` for `participants` people.
///
/// Per-person items charge the unit price once per participant; flat items charge the
/// unit price once.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the multiplication overflows.
pub fn price_for(item: &CatalogItem, participants: u32) -> Result<Money, PricingError> {
    let unit = item.unit_price();
    match item.pricing {
        PricingMode::Flat => Ok(unit),
        PricingMode::PerPerson => unit
            .checked_mul(participants)
            .ok_or(PricingError::Overflow { participants }),
    }
}

/// Number of units billed by the payment provider for this item.
#[must_use]
pub const fn billed_quantity(pricing: PricingMode, participants: u32) -> u32 {
    match pricing {
        PricingMode::Flat => 1,
        PricingMode::PerPerson => participants,
    }
}
