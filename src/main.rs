mod bot;
mod config;
mod error;
mod llm;
mod markup;
mod media;
mod platform;
mod server;
#[cfg(test)]
mod testing;
mod update;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;
use crate::llm::GeminiClient;
use crate::platform::telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,geminibot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        info!("Loading configuration from: {}", path.display());
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Model: {}", config.gemini.model);
    info!("  Bind address: {}", config.server.bind_addr);

    // Clients are built once and shared by every request
    let messenger = TelegramMessenger::new(teloxide::Bot::new(&config.telegram.bot_token));
    if let Some(url) = &config.telegram.webhook_url {
        if let Err(e) = messenger.register_webhook(url).await {
            warn!("Webhook registration failed: {:#}", e);
        }
    }
    let generator = GeminiClient::new(config.gemini.clone());
    let state = Arc::new(AppState::new(Arc::new(messenger), Arc::new(generator)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;

    info!("Webhook server listening on {}", config.server.bind_addr);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
