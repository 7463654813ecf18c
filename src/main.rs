use std::sync::Arc;

use cascade_guard::cache::InMemoryStateCache;
use cascade_guard::config::Settings;
use cascade_guard::db;
use cascade_guard::engine::Engine;
use cascade_guard::ledger::{InfractionLedger, MemoryLedger, PgLedger};
use cascade_guard::services::sanction::{spawn_expiry_sweeper, LoggingSink};
use cascade_guard::services::toxicity::KeywordScorer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cascade Guard moderation engine");

    // Load settings
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };

    // Ledger: Postgres when configured, otherwise in-memory for local runs
    let ledger: Arc<dyn InfractionLedger> = match settings.database_url.as_deref() {
        Some(url) => {
            let pool = match db::pool::create_pool(url).await {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to create database pool: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = db::pool::run_migrations(&pool).await {
                error!("Failed to run migrations: {}", e);
                std::process::exit(1);
            }
            info!("Database initialized successfully");
            Arc::new(PgLedger::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory ledger (state is lost on restart)");
            Arc::new(MemoryLedger::new())
        }
    };

    let cache = Arc::new(InMemoryStateCache::new(settings.cache_ttl()));
    let engine = Arc::new(Engine::new(
        settings,
        ledger,
        cache,
        Arc::new(KeywordScorer::new()),
        Arc::new(LoggingSink),
    ));

    // Background expiry sweeper; the first pass lifts anything that expired
    // while the process was down
    let _sweeper = spawn_expiry_sweeper(engine.clone());

    // Stand-in connector: one JSON event per stdin line
    info!("Reading events from stdin (one JSON object per line)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let value: serde_json::Value = match serde_json::from_str(line) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Skipping unparseable line: {}", e);
                        continue;
                    }
                };
                if let Err(e) = engine.ingest(value).await {
                    error!("Event processing failed: {}", e);
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    let metrics = engine.metrics();
    info!(
        events_ingested = metrics.events_ingested,
        sanctions_issued = metrics.sanctions_issued,
        events_dropped = metrics.events_dropped,
        "Input closed, shutting down"
    );
}
