//! # Ausflug Core
//!
//! Domain core for the AusflugÄgypten storefront: catalog items, booking inquiries,
//! checkout sessions, payment-webhook reconciliation and review moderation.
//!
//! The crate follows a functional-core / imperative-shell split:
//!
//! - **Domain types** ([`catalog`], [`booking`], [`payment`], [`review`], [`money`]) are plain
//!   owned data with their invariants enforced at construction.
//! - **Reducers** ([`aggregates`]) own every status transition of a booking or a payment.
//!   They mutate state in place and return [`effect::Effect`] descriptions; they never perform I/O.
//! - **Ports** ([`repository`], [`provider`], [`notify`]) are traits injected into the
//!   services. Postgres, Stripe and SMTP adapters live in other crates.
//! - **Services** ([`services`]) orchestrate validation, reducers, persistence and effects
//!   for each use case.
//!
//! ## Example
//!
//! ```ignore
//! use ausflug_core::services::InquiryService;
//!
//! let booking = inquiries.submit(&form).await?;
//! println!("confirmation code: {}", booking.confirmation_code);
//! ```

pub mod aggregates;
pub mod booking;
pub mod catalog;
pub mod confirmation;
pub mod effect;
pub mod environment;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod money;
pub mod notify;
pub mod payment;
pub mod pricing;
pub mod provider;
pub mod reducer;
pub mod repository;
pub mod review;
pub mod runtime;
pub mod services;
pub mod validation;
pub mod webhook;

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use smallvec::{SmallVec, smallvec};

pub use booking::{Booking, BookingId, BookingStatus, Contact, NewBooking, Participants};
pub use catalog::{CatalogItem, CatalogKind, CatalogRef, Reviewable};
pub use confirmation::ConfirmationCode;
pub use error::{BookingError, StoreError, TransitionError};
pub use money::Money;
pub use payment::{NewPayment, Payment, PaymentId, PaymentStatus};
pub use review::{NewReview, RatingSummary, Review, ReviewId};
