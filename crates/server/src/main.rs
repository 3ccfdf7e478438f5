use std::sync::Arc;

use server::app;
use server::clients::sqs::SqsEventBus;
use server::clock::ClockService;
use server::config;
use server::db::{self, MatchRepository, MemoryMatchRepository, PgMatchRepository};
use server::events::{BroadcastBus, EventBus, FanoutBus};
use server::service::GameService;
use server::tasks::spawn_supervised;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();
    let cancel = CancellationToken::new();

    let repo: Arc<dyn MatchRepository> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::pool::create_pool(url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Running migrations...");
            db::pool::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            Arc::new(PgMatchRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set - matches are kept in memory");
            Arc::new(MemoryMatchRepository::new())
        }
    };

    // Event buses: WebSocket broadcast always, SQS when configured
    let broadcast = Arc::new(BroadcastBus::new(1024));
    let mut buses: Vec<Arc<dyn EventBus>> = vec![broadcast.clone()];
    let mut background = Vec::new();
    if let Some((sqs_bus, forwarder)) = SqsEventBus::new(&config).await {
        tracing::info!("SQS event forwarding configured");
        buses.push(Arc::new(sqs_bus));
        let token = cancel.clone();
        background.push(spawn_supervised("sqs-forwarder", cancel.clone(), move || {
            let forwarder = forwarder.clone();
            let token = token.clone();
            async move { forwarder.run(token).await }
        }));
    } else {
        tracing::info!("SQS not configured - events stay in process");
    }
    let events: Arc<dyn EventBus> = Arc::new(FanoutBus::new(buses));

    let service = Arc::new(GameService::new(repo, events, config.game));

    let clock = Arc::new(ClockService::new(
        service.clone(),
        config.clock_scan_interval,
        config.clock_scan_limit,
    ));
    {
        let token = cancel.clone();
        background.push(spawn_supervised("clock-scanner", cancel.clone(), move || {
            let clock = clock.clone();
            let token = token.clone();
            async move { clock.run(token).await }
        }));
    }

    let app = app::build_router(config.clone(), service, broadcast);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    cancel.cancel();
    for task in background {
        let _ = task.await;
    }
    Ok(())
}
