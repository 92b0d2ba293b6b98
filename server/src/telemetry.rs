//! Tracing and Prometheus setup.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "ausflug=info,tower_http=info,sqlx=warn";

/// Errors from telemetry setup.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The tracing subscriber could not be installed
    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),
    /// Metrics address is not a socket address
    #[error("Invalid metrics address {0}")]
    Address(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installs the global subscriber: `RUST_LOG` filter (or [`DEFAULT_LOG_FILTER`]) and the
/// `fmt` layer.
///
/// # Errors
///
/// Returns [`TelemetryError::Tracing`] if a subscriber is already installed.
pub fn init_tracing() -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TelemetryError::Tracing(e.to_string()))
}

/// Installs the Prometheus recorder with its own HTTP listener and registers metric
/// descriptions. Must run inside the tokio runtime.
///
/// # Errors
///
/// Returns [`TelemetryError`] for a bad address or if a recorder is already installed.
pub fn start_metrics(addr: &str) -> Result<SocketAddr, TelemetryError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|_| TelemetryError::Address(addr.to_string()))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::Install(e.to_string()))?;
    ausflug_core::metrics::describe();
    tracing::info!(%addr, "metrics available at http://{addr}/metrics");
    Ok(addr)
}
