//! Cultural Sound Lab payment webhook service.

use std::error::Error;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sound_lab_payments::adapters::http::{app_router, WebhookAppState};
use sound_lab_payments::adapters::postgres::{
    PostgresEntitlementRepository, PostgresFulfillmentQueue, PostgresOrderRepository,
    PostgresPaymentRepository, PostgresRefundRepository, PostgresSubscriptionRepository,
    PostgresWebhookEventRepository,
};
use sound_lab_payments::adapters::{
    FulfillmentRetryWorker, FulfillmentRetryWorkerConfig, WebhookLedgerPruner,
};
use sound_lab_payments::application::{
    EventProjector, FulfillmentHandler, FulfillmentSettings, ProcessWebhookHandler,
};
use sound_lab_payments::config::AppConfig;
use sound_lab_payments::domain::webhooks::{
    RazorpayWebhookVerifier, StripeWebhookVerifier, WebhookAuthenticator,
};
use sound_lab_payments::ports::FulfillmentQueue;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load_validated()?;
    init_tracing(&config);

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.stripe.is_test_mode(),
        razorpay_test_mode = config.payment.razorpay.is_test_mode(),
        "Starting payment webhook service"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let queue: Arc<dyn FulfillmentQueue> = Arc::new(PostgresFulfillmentQueue::new(pool.clone()));
    let fulfillment = Arc::new(FulfillmentHandler::new(
        Arc::new(PostgresOrderRepository::new(pool.clone())),
        Arc::new(PostgresEntitlementRepository::new(pool.clone())),
        queue.clone(),
        FulfillmentSettings {
            max_attempts: config.fulfillment.max_attempts,
            base_backoff_secs: config.fulfillment.base_backoff_secs,
        },
    ));
    let state = app_state(&config, &pool, fulfillment.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let retry_worker = FulfillmentRetryWorker::with_config(
        queue,
        fulfillment,
        FulfillmentRetryWorkerConfig::default()
            .with_poll_interval(config.fulfillment.poll_interval())
            .with_batch_size(config.fulfillment.batch_size),
    );
    let retry_task = {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { retry_worker.run(shutdown).await })
    };
    let pruner = WebhookLedgerPruner::new(
        Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        config.ledger.retention_days,
        config.ledger.prune_interval(),
    );
    let prune_task = tokio::spawn(async move { pruner.run(shutdown_rx).await });

    let app = app_router(state, config.server.request_timeout());
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(retry_task, prune_task);
    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn app_state(config: &AppConfig, pool: &PgPool, fulfillment: Arc<FulfillmentHandler>) -> WebhookAppState {
    let projector = EventProjector::new(
        Arc::new(PostgresPaymentRepository::new(pool.clone())),
        Arc::new(PostgresOrderRepository::new(pool.clone())),
        Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        Arc::new(PostgresRefundRepository::new(pool.clone())),
        fulfillment,
    );

    let razorpay = Arc::new(RazorpayWebhookVerifier::new(
        config.payment.razorpay.webhook_secret(),
        config.payment.razorpay.key_secret(),
    ));
    let stripe: Arc<dyn WebhookAuthenticator> = Arc::new(
        StripeWebhookVerifier::new(config.payment.stripe.webhook_secret())
            .with_tolerance(config.payment.stripe.signature_tolerance_secs),
    );
    let authenticators = vec![stripe, razorpay.clone() as Arc<dyn WebhookAuthenticator>];

    WebhookAppState {
        webhook_handler: Arc::new(ProcessWebhookHandler::new(
            authenticators,
            Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
            Arc::new(projector),
        )),
        razorpay_verifier: razorpay,
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let json = config.server.json_logs();

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining requests");
}
