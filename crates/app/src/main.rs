use std::time::Duration;

use engine::{
    Aggregation, LocalPaymentSource, PaymentSource, StripeConfig, StripePaymentSource,
};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

const DEFAULT_POLL_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "verkstad={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let sie = settings.sie.unwrap_or_default().into_sie_settings();
    let aggregation = match &settings.worker {
        Some(worker) => match worker.aggregation.as_deref() {
            Some(raw) => Aggregation::try_from(raw)?,
            None => Aggregation::default(),
        },
        None => Aggregation::default(),
    };
    let poll_interval = Duration::from_secs(
        settings
            .worker
            .as_ref()
            .and_then(|w| w.poll_seconds)
            .unwrap_or(DEFAULT_POLL_SECONDS),
    );

    if let Some(server) = settings.server {
        tracing::info!("Found server settings...");
        let db = parse_database(&server.database).await?;

        let server_engine = engine::Engine::builder()
            .database(db.clone())
            .sie(sie.clone())
            .aggregation(aggregation)
            .build()
            .await?;
        let worker_engine = engine::Engine::builder()
            .database(db.clone())
            .sie(sie.clone())
            .aggregation(aggregation)
            .build()
            .await?;

        let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
        let addr = format!("{}:{}", bind, server.port);
        tasks.spawn(async move {
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(server_engine, db, listener).await {
                tracing::error!("server failed: {err}");
            }
        });

        let source: Box<dyn PaymentSource> = match settings.stripe {
            Some(stripe) => {
                tracing::info!("Found stripe settings...");
                let mut config = StripeConfig::new(stripe.secret_key);
                if let Some(base_url) = stripe.base_url {
                    config.base_url = base_url;
                }
                Box::new(StripePaymentSource::new(config))
            }
            None => {
                tracing::warn!("no stripe settings, using the local payment source");
                Box::new(LocalPaymentSource)
            }
        };
        tasks.spawn(async move {
            run_export_worker(worker_engine, source, poll_interval).await;
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

/// Polls the export queue until shutdown. Failed exports are already marked
/// terminal by the engine, so the loop only logs and keeps going.
async fn run_export_worker(
    engine: engine::Engine,
    source: Box<dyn PaymentSource>,
    poll_interval: Duration,
) {
    tracing::info!("export worker started");
    loop {
        match engine.process_next_pending(source.as_ref()).await {
            // Keep draining while the queue has work.
            Ok(Some(_)) => {}
            Ok(None) => tokio::time::sleep(poll_interval).await,
            Err(err) => {
                tracing::error!("export worker: {err}");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
