//! Storefront checkout server.
//!
//! Receives payment provider webhooks and turns completed checkouts into
//! orders. Configuration comes from `STOREFRONT__*` environment variables.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use storefront::adapters::email::{ResendConfig, ResendNotificationSender};
use storefront::adapters::http::{checkout_router, CheckoutAppState};
use storefront::adapters::postgres::{
    PostgresInventoryRepository, PostgresOrderRepository, PostgresShippingAddressRepository,
    PostgresSubscriptionPaymentRepository, PostgresWebhookEventRepository,
};
use storefront::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use storefront::application::{
    CompleteCheckoutHandler, HandlePaymentWebhookHandler, HandleSubscriptionEventHandler,
};
use storefront::config::AppConfig;
use storefront::ports::{NotificationSender, PaymentProvider, WebhookEventRepository};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load_validated()?;
    init_tracing(&config);

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    tracing::info!("Database pool created");

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let payment_provider: Arc<dyn PaymentProvider> = Arc::new(StripePaymentAdapter::new(
        StripeConfig::new(
            config.payment.stripe_api_key.clone(),
            config.payment.stripe_webhook_secret.clone(),
        )
        .with_base_url(config.payment.api_base_url.clone())
        .with_require_livemode(config.payment.require_livemode),
    ));
    let notifications: Arc<dyn NotificationSender> = Arc::new(ResendNotificationSender::new(
        ResendConfig::new(config.email.resend_api_key.clone(), config.email.from_header())
            .with_base_url(config.email.api_base_url.clone()),
    ));
    let webhook_events: Arc<dyn WebhookEventRepository> =
        Arc::new(PostgresWebhookEventRepository::new(pool.clone()));

    let complete_checkout = Arc::new(CompleteCheckoutHandler::new(
        payment_provider.clone(),
        Arc::new(PostgresOrderRepository::new(pool.clone())),
        Arc::new(PostgresInventoryRepository::new(pool.clone())),
        Arc::new(PostgresShippingAddressRepository::new(pool.clone())),
        notifications.clone(),
    ));
    let subscription_events = Arc::new(HandleSubscriptionEventHandler::new(
        payment_provider.clone(),
        Arc::new(PostgresSubscriptionPaymentRepository::new(pool.clone())),
        notifications,
    ));
    let webhook_handler = Arc::new(HandlePaymentWebhookHandler::new(
        payment_provider,
        webhook_events.clone(),
        complete_checkout,
        subscription_events,
    ));

    if config.database.webhook_retention_days > 0 {
        spawn_retention_sweep(webhook_events, config.database.webhook_retention_days);
    }

    let app = checkout_router()
        .with_state(CheckoutAppState::new(webhook_handler))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "storefront listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// JSON output in production, human-readable output otherwise.
fn init_tracing(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Periodically drops webhook ledger records past the retention window.
fn spawn_retention_sweep(repository: Arc<dyn WebhookEventRepository>, retention_days: u32) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
            match repository.delete_before(cutoff).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Pruned webhook ledger"),
                Err(e) => tracing::warn!(error = %e, "Webhook ledger pruning failed"),
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
