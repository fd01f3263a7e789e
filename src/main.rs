use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use word_reminder_backend::config::Config;
use word_reminder_backend::db::Queries;
use word_reminder_backend::logging;
use word_reminder_backend::push::{PushSender, WebPushSender};
use word_reminder_backend::queue::CronQueue;
use word_reminder_backend::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "database connection failed");
            return;
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!(error = %err, "migrations failed");
        return;
    }

    let queue = match CronQueue::new().await {
        Ok(queue) => Arc::new(queue),
        Err(err) => {
            tracing::error!(error = %err, "scheduler startup failed");
            return;
        }
    };

    let push: Arc<dyn PushSender> = match WebPushSender::new(&config) {
        Ok(sender) => Arc::new(sender),
        Err(err) => {
            tracing::error!(error = %err, "web push client initialization failed");
            return;
        }
    };

    let state = AppState::new(Queries::postgres(pool), queue.clone(), push);

    if let Err(err) = state.resume_schedules().await {
        tracing::error!(error = %err, "failed to resume schedules");
        return;
    }

    tracing::info!("word reminder scheduling core running");

    shutdown_signal().await;

    tracing::info!("shutdown signal received");
    if let Err(err) = queue.shutdown().await {
        tracing::error!(error = %err, "scheduler shutdown failed");
    }
    tracing::info!("graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
