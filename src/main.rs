mod command;
mod config;
mod dispatch;
mod payload;
mod speedtest;
mod webhook;
mod whatsapp;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::speedtest::HttpSpeedMeter;
use crate::webhook::AppState;
use crate::whatsapp::WhatsAppClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,speedbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // .env is honored for local runs; deployments set variables directly.
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded");
    info!("  Sender account: {}", config.phone_number_id);
    info!("  Measurement servers: {:?}", config.speedtest_servers);

    // One HTTP client shared by the messenger and the measurement engine.
    let http = reqwest::Client::new();
    let wa = WhatsAppClient::new(http.clone(), &config);
    let meter = HttpSpeedMeter::new(http, &config.speedtest_servers)
        .context("Failed to build the measurement engine")?;

    let state = AppState {
        config: Arc::new(config),
        wa: Arc::new(wa),
        meter: Arc::new(meter),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Webhook server listening on {}", addr);

    axum::serve(listener, webhook::router(state))
        .await
        .context("Webhook server error")?;

    Ok(())
}
