//! Order intake bot.
//!
//! Receives chat events over HTTP, walks each user through placing an
//! order, and submits completed orders to the order service.

use std::sync::Arc;

use database::Database;
use dialogue::{DialogueEngine, LoggingSender, ReplySender, SessionReaper, SqliteStore};
use intake_bot::{scheduler, server, Config, EventProcessor, WebhookSender};
use order_gateway::{HttpOrderGateway, OrderCodeGenerator};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting intake bot");

    // Connect to database
    let db = Database::connect_with(&config.database_url, config.pool_size, config.acquire_timeout)
        .await?;
    db.migrate().await?;
    let store = SqliteStore::new(db.clone());

    // Order service
    let gateway = HttpOrderGateway::new(config.gateway.clone())?;
    let codes = OrderCodeGenerator::new(&config.gateway.code_salt)?;
    let engine = Arc::new(DialogueEngine::new(store.clone(), gateway).with_code_generator(codes));

    // Reply delivery
    let sender: Arc<dyn ReplySender> = match &config.reply_webhook_url {
        Some(url) => {
            info!("Delivering replies to {}", url);
            Arc::new(WebhookSender::new(url.clone(), config.gateway.timeout)?)
        }
        None => {
            info!("INTAKE_REPLY_WEBHOOK_URL not set, replies are only logged");
            Arc::new(LoggingSender)
        }
    };

    let processor = Arc::new(EventProcessor::new(engine, sender, config.event_timeout));

    // Session upkeep
    let reaper = SessionReaper::new(store).with_max_idle(config.session_max_idle);
    let reaper_task = scheduler::spawn_reaper(reaper, config.reaper_interval);

    // Start server
    let app = server::router(processor);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "Listening for events");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    reaper_task.abort();
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C");
    }
}
