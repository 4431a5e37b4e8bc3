use std::time::Duration;

use boxoffice_core::queue::{CONFIRMATION_QUEUE, TICKET_ARTIFACT_QUEUE};
use boxoffice_queue::{JobQueue, Worker};
use boxoffice_worker::artifact::TicketRenderer;
use boxoffice_worker::config::WorkerConfig;
use boxoffice_worker::handlers::{ArtifactHandler, ConfirmationHandler};
use boxoffice_worker::mailer::{EmailConfig, Mailer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice_worker=debug,boxoffice_queue=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        tickets_dir = %config.tickets_dir.display(),
        artifact_concurrency = config.artifact_concurrency,
        confirmation_concurrency = config.confirmation_concurrency,
        "Loaded worker configuration",
    );

    let mailer = match EmailConfig::from_env() {
        Some(email) => {
            tracing::info!(host = %email.smtp_host, port = email.smtp_port, "SMTP delivery enabled");
            Some(Mailer::new(&email).expect("Invalid SMTP configuration"))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, confirmation emails will be logged only");
            None
        }
    };

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = boxoffice_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    boxoffice_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    boxoffice_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Workers ---
    let renderer = TicketRenderer::new(config.tickets_dir.clone());

    let artifacts = Worker::new(
        JobQueue::open(pool.clone(), TICKET_ARTIFACT_QUEUE).expect("Unknown artifact queue"),
        ArtifactHandler::new(renderer.clone()),
        config.artifact_worker(),
    );
    let confirmations = Worker::new(
        JobQueue::open(pool.clone(), CONFIRMATION_QUEUE).expect("Unknown confirmation queue"),
        ConfirmationHandler::new(mailer, renderer),
        config.confirmation_worker(),
    );

    let cancel = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();
    {
        let cancel = cancel.clone();
        tasks.spawn(async move { artifacts.run(cancel).await });
    }
    {
        let cancel = cancel.clone();
        tasks.spawn(async move { confirmations.run(cancel).await });
    }

    shutdown_signal().await;
    cancel.cancel();

    // --- Drain ---
    let drained = tokio::time::timeout(config.shutdown_timeout, async {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task panicked");
            }
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Workers did not drain in time, abandoning in-flight jobs",
        );
        tasks.abort_all();
    }

    if tokio::time::timeout(Duration::from_secs(5), pool.close())
        .await
        .is_err()
    {
        tracing::warn!("Database pool did not close within the shutdown timeout");
    }

    tracing::info!("Worker shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping workers");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping workers");
        }
    }
}
