use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley_chat::ChatOrchestrator;
use parley_persist::{JsonFileStore, SessionStore};

mod commands;
mod config;
mod repl;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!(model = %config.chat.model, base_url = %config.chat.base_url, "Starting parley");

    let store = open_store(&config);

    let orchestrator = ChatOrchestrator::builder()
        .store(store)
        .config(config.chat.clone())
        .context_policy(config.context.clone().into())
        .build()?;

    repl::run(orchestrator).await
}

fn open_store(config: &Config) -> SessionStore {
    if config.storage.in_memory {
        tracing::info!("Keeping sessions in memory");
        return SessionStore::in_memory();
    }

    let path = config.storage.resolved_path();
    match JsonFileStore::new(path.clone()) {
        Ok(backend) => {
            tracing::info!(path = %path.display(), "Session file");
            SessionStore::open(Arc::new(backend))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Session file unavailable, keeping sessions in memory");
            SessionStore::in_memory()
        }
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout belongs to the conversation
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
