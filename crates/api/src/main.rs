use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use campus_events_api::app::{create_app, AppState};
use campus_events_api::config::Config;
use campus_events_api::jobs::{JobScheduler, MailOutboxJob, PoolMetricsJob};
use campus_events_api::middleware::{init_metrics, logging::init_logging};
use campus_events_api::services::{EmailService, FcmPushGateway};
use domain::services::{MockPushGateway, PushGateway};
use persistence::repositories::{MailRepository, UserRepository};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging);
    init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting Campus Events API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    // Admin claims are only ever granted here
    let users = UserRepository::new(pool.clone());
    for user_id in &config.admin.bootstrap_user_ids {
        users.grant_admin(*user_id).await?;
        info!(user_id = %user_id, "Admin claim granted");
    }

    let push: Arc<dyn PushGateway> = if config.fcm.enabled {
        Arc::new(FcmPushGateway::new(config.fcm.clone())?)
    } else {
        warn!("FCM disabled, push notifications are logged only");
        Arc::new(MockPushGateway::new())
    };

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(
        pool.clone(),
        config.jobs.pool_metrics_interval_secs,
    ));
    if config.email.enabled {
        scheduler.register(MailOutboxJob::new(
            MailRepository::new(pool.clone()),
            EmailService::new(config.email.clone())?,
            config.jobs.mail_outbox_interval_secs,
            config.jobs.mail_batch_size,
            config.jobs.mail_max_attempts,
        ));
    } else {
        warn!("Email disabled, queued mail stays pending");
    }
    scheduler.start();

    let addr = config.socket_addr()?;
    let state = AppState::new(config, pool, push)?;
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
