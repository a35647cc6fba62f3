// Coins Explorer - Web Server
// Serves the filtered dataset as JSON/CSV plus the geo files

use anyhow::{Context, Result};
use coins_explorer::api::{router, AppState};
use coins_explorer::{init_logging, Config, Datasets, FileSource, LogConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::from_env().context("Invalid logging configuration")?;
    init_logging(&log_config).context("Failed to initialize logging")?;

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        coins = ?config.data.coins,
        wages = ?config.data.wages,
        max_age_hours = config.cache.max_age_hours,
        "Configuration loaded"
    );

    let source = FileSource::new(config.data.clone());
    let datasets = Datasets::new(Box::new(source), config.cache.max_age());
    let app = router(AppState::new(datasets, &config), &config);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!(bind = %config.server.bind, "🚀 Server running");

    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
