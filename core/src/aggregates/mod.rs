//! Reducers owning the booking and payment lifecycles.

pub mod booking;
pub mod payment;

pub use booking::{BookingAction, BookingEnvironment, BookingReducer, BookingState};
pub use payment::{PaymentAction, PaymentEnvironment, PaymentReducer, PaymentState};
