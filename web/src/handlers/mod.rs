//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod reviews;
pub mod webhook;

pub use health::{health_check, readiness_check};
