use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use turnstile_server::config::Config;
use turnstile_server::registry::Registry;
use turnstile_server::session::SessionStore;
use turnstile_server::telegram::TelegramClient;
use turnstile_server::{webhook, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting content distribution bot");

    let config = Config::from_env().context("Failed to load configuration")?;

    let db_path = config.state_dir.join("turnstile-state.db");
    info!("Using state database: {}", db_path.display());
    let registry = Registry::open(&db_path).context("Failed to initialize state database")?;
    registry.seed_admins(&config.seed_admins).await?;

    let app_state = Arc::new(AppState {
        registry,
        transport: Arc::new(TelegramClient::new(&config.bot_token)),
        sessions: SessionStore::new(),
        required_channels: config.required_channels,
        announcement_channels: config.announcement_channels,
        bot_username: config.bot_username,
        webhook_secret: config.webhook_secret,
    });

    let app = webhook::router(app_state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
