use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::{info, warn};

use crate::command::Command;
use crate::config::Config;
use crate::dispatch;
use crate::payload::{InboundMessage, WebhookEvent};
use crate::speedtest::SpeedMeter;
use crate::whatsapp::WhatsAppClient;

/// Shared application state, cheap to clone into handlers and tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub wa: Arc<WhatsAppClient>,
    pub meter: Arc<dyn SpeedMeter>,
}

/// Build the webhook router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/webhook", get(verify).post(receive))
        .with_state(state)
}

async fn index() -> &'static str {
    "speedbot is running"
}

#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /webhook: subscription verification handshake. Stateless: echo
/// the challenge on a match, 403 on anything else.
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    let token_ok = params.verify_token.as_deref() == Some(state.config.verify_token.as_str());
    if params.mode.as_deref() == Some("subscribe") && token_ok {
        info!("Webhook verification succeeded");
        return (StatusCode::OK, params.challenge.unwrap_or_default());
    }
    warn!("Webhook verification failed");
    (StatusCode::FORBIDDEN, "Forbidden".to_string())
}

/// POST /webhook: inbound event delivery. Always answers 200 "OK" so
/// the platform never redelivers, whatever the payload contained.
async fn receive(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    let event = WebhookEvent::from_body(&body);
    for message in event.messages() {
        handle_message(&state, message).await;
    }
    (StatusCode::OK, "OK")
}

async fn handle_message(state: &AppState, message: &InboundMessage) {
    // A message we cannot answer is a message we skip.
    let Some(from) = message.from.as_deref() else {
        return;
    };

    if let Some(text) = message.text.as_ref().and_then(|t| t.body.as_deref()) {
        info!("Message from {}: {}", from, text);
        match Command::parse(text) {
            Some(command) => run_command(state, command, from).await,
            None => {
                if let Err(e) = state
                    .wa
                    .send_text(from, "Send 'menu' to see options.")
                    .await
                {
                    warn!("Failed to send fallback reply to {}: {:#}", from, e);
                }
            }
        }
    } else if let Some(id) = button_reply_id(message) {
        info!("Button reply from {}: {}", from, id);
        if let Some(command) = Command::from_button_id(id) {
            run_command(state, command, from).await;
        }
    }
}

fn button_reply_id(message: &InboundMessage) -> Option<&str> {
    message
        .interactive
        .as_ref()?
        .button_reply
        .as_ref()?
        .id
        .as_deref()
}

async fn run_command(state: &AppState, command: Command, from: &str) {
    match command {
        Command::Menu => {
            if let Err(e) = state.wa.send_menu(from).await {
                warn!("Failed to send menu to {}: {:#}", from, e);
            }
        }
        Command::Speedtest => {
            let _ = dispatch::spawn(state.clone(), from.to_string(), false);
        }
        Command::Quick => {
            let _ = dispatch::spawn(state.clone(), from.to_string(), true);
        }
        Command::Ping => {
            let reply = match state.meter.ping().await {
                Ok(ping_ms) => format!("📡 Ping: {:.2} ms", ping_ms),
                Err(e) => format!("⚠️ Ping failed: {:#}", e),
            };
            if let Err(e) = state.wa.send_text(from, &reply).await {
                warn!("Failed to send ping reply to {}: {:#}", from, e);
            }
        }
    }
}
