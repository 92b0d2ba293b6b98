//! Wiring and lifecycle.

use crate::config::Config;
use crate::mailer::build_notifier;
use crate::stripe::StripeClient;
use anyhow::Context;
use ausflug_core::environment::{Clock, CodeGenerator, SystemClock, UuidCodeGenerator};
use ausflug_core::notify::Notifier;
use ausflug_core::provider::PaymentProvider;
use ausflug_core::runtime::EffectRunner;
use ausflug_core::services::{
    BookingAdminService, CatalogService, CheckoutService, DashboardService, InquiryService,
    ReconciliationService, ReviewService,
};
use ausflug_core::webhook::WebhookVerifier;
use ausflug_postgres::{PoolSettings, PostgresStore};
use ausflug_web::{AppState, WebSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Builds every service over one store.
///
/// # Errors
///
/// Returns an error if the webhook tolerance does not fit a signed duration.
pub fn build_state(
    config: &Config,
    store: PostgresStore,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<AppState> {
    let store = Arc::new(store);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codes: Arc<dyn CodeGenerator> = Arc::new(UuidCodeGenerator);
    let calendar = config.site.calendar;
    let effects = EffectRunner::new(notifier);
    let tolerance = chrono::Duration::from_std(config.stripe.webhook_tolerance)
        .context("STRIPE_WEBHOOK_TOLERANCE_SECS out of range")?;

    Ok(AppState {
        catalog: CatalogService::new(store.clone(), store.clone()),
        inquiries: InquiryService::new(
            store.clone(),
            store.clone(),
            Arc::clone(&clock),
            Arc::clone(&codes),
            calendar,
            effects.clone(),
        ),
        checkout: CheckoutService::new(
            store.clone(),
            provider,
            Arc::clone(&clock),
            calendar,
        ),
        reconciliation: ReconciliationService::new(
            store.clone(),
            store.clone(),
            Arc::clone(&clock),
            codes,
            config.site.failure_policy,
            effects.clone(),
        ),
        reviews: ReviewService::new(store.clone(), store.clone()),
        staff: BookingAdminService::new(store.clone(), Arc::clone(&clock), effects),
        dashboard: DashboardService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::clone(&clock),
            calendar,
        ),
        verifier: WebhookVerifier::new(config.stripe.webhook_secret.clone(), tolerance, clock),
        readiness: store,
        settings: WebSettings {
            public_base_url: config.server.public_base_url.clone(),
            admin_token: config.site.admin_token.clone(),
        },
    })
}

/// Connects, migrates and serves until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the database, the payment client, the notifier or the listener
/// cannot be set up.
pub async fn run(config: Config) -> anyhow::Result<()> {
    if config.stripe.secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set; checkout sessions will fail");
    }
    if config.stripe.webhook_secret.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; webhook deliveries will be rejected with 400");
    }
    if config.site.admin_token.is_none() {
        tracing::info!("ADMIN_API_TOKEN not set; staff endpoints are disabled");
    }

    let settings = PoolSettings {
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        acquire_timeout: config.database.connect_timeout,
    };
    let store = PostgresStore::connect(&config.database.url, &settings)
        .await
        .context("connecting to PostgreSQL")?;
    store.migrate().await.context("running migrations")?;
    tracing::info!("✓ Database ready");

    let provider = StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.api_base.clone(),
        config.stripe.currency.clone(),
    )
    .context("building Stripe client")?;
    let notifier = build_notifier(&config.email).context("building notifier")?;

    let state = build_state(&config, store, Arc::new(provider), notifier)?;
    let app = ausflug_web::router(state);

    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(address = %addr, "Server listening");

    serve(listener, app, config.server.shutdown_timeout).await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Serves until a shutdown signal, then gives in-flight requests `grace` to finish.
async fn serve(
    listener: tokio::net::TcpListener,
    app: axum::Router,
    grace: Duration,
) -> anyhow::Result<()> {
    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });
    let mut server = std::pin::pin!(server.into_future());

    tokio::select! {
        result = &mut server => return result.context("server error"),
        _ = stop_rx.changed() => {}
    }

    match tokio::time::timeout(grace, server).await {
        Ok(result) => result.context("server error"),
        Err(_) => {
            tracing::warn!(timeout_secs = grace.as_secs(), "shutdown timed out; dropping open connections");
            Ok(())
        }
    }
}

/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
