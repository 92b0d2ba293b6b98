//! AusflugÄgypten server.
//!
//! Reads the configuration from the environment, connects and migrates `PostgreSQL`,
//! wires the Stripe client and the notifier into the services and serves the
//! `ausflug-web` router with graceful shutdown. Prometheus metrics are exposed on a
//! separate listener.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]

pub mod app;
pub mod config;
pub mod mailer;
pub mod stripe;
pub mod telemetry;

pub use app::{build_state, run};
pub use config::Config;
